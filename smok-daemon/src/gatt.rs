use std::future::Future;
use std::io;
use std::time::Duration;

use async_trait::async_trait;

use bluer::adv::{Advertisement, Feature, Type};
use bluer::gatt::local::{
    Application, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, CharacteristicReadRequest,
    CharacteristicWrite, CharacteristicWriteMethod, CharacteristicWriteRequest, Descriptor,
    DescriptorRead, DescriptorReadRequest, ReqError, Service,
};
use futures::FutureExt as _;
use tokio::time::{self, MissedTickBehavior};
use uuid::Uuid;

use smok_common::constants::*;
use smok_common::logger::*;
use smok_common::sensor::TemperatureSensor;
use smok_common::wifi::WifiError;
use smok_common::{SmokService, WifiOutcome};

pub fn advertisement(local_name: &str) -> Advertisement {
    Advertisement {
        advertisement_type: Type::Peripheral,
        local_name: Some(local_name.to_owned()),
        discoverable: Some(true),
        system_includes: [Feature::TxPower].into_iter().collect(),
        ..Default::default()
    }
}

/// The SMOK primary service with its four characteristics, every callback holds a
/// clone of `service` so they all see the same flags
pub fn application<S>(service: &SmokService<S>, notify_period: Duration) -> Application
where
    S: TemperatureSensor + 'static,
{
    Application {
        services: vec![Service {
            uuid: SMOK_SERVICE,
            primary: true,
            characteristics: vec![
                authentication(service, notify_period),
                wifi_config(service),
                temperature(service, notify_period),
                unit(service),
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn description(uuid: Uuid, text: &'static str) -> Descriptor {
    Descriptor {
        uuid,
        read: Some(DescriptorRead {
            read: true,
            fun: Box::new(move |_req: DescriptorReadRequest| read_description(text).boxed()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

async fn read_description(text: &'static str) -> Result<Vec<u8>, ReqError> {
    Ok(text.as_bytes().to_vec())
}

/// Receiving end of a notification session
#[async_trait]
pub trait NotifySink: Send {
    /// The client unsubscribed or went away
    fn is_stopped(&self) -> bool;

    async fn send(&mut self, value: Vec<u8>) -> io::Result<()>;
}

#[async_trait]
impl NotifySink for CharacteristicNotifier {
    fn is_stopped(&self) -> bool {
        CharacteristicNotifier::is_stopped(self)
    }

    async fn send(&mut self, value: Vec<u8>) -> io::Result<()> {
        self.notify(value).await.map_err(io::Error::from)
    }
}

/// Publishes right away then once per period until the client unsubscribes,
/// a None value skips the tick
async fn notify_every<N, F, Fut>(mut notifier: N, period: Duration, mut next_value: F)
where
    N: NotifySink,
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<Vec<u8>>>,
{
    let mut interval = time::interval(period);
    // A slow client gets the next value one period later, not a burst of late ones
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if notifier.is_stopped() {
            break;
        }

        let Some(value) = next_value().await else {
            continue;
        };

        if let Err(err) = notifier.send(value).await {
            warn!("Notification failed, ending subscription: {err}");
            break;
        }
    }

    debug!("Notification session ended");
}

fn authentication<S>(service: &SmokService<S>, notify_period: Duration) -> Characteristic
where
    S: TemperatureSensor + 'static,
{
    let read_service = service.clone();
    let write_service = service.clone();
    let notify_service = service.clone();

    Characteristic {
        uuid: AUTHENTICATION,
        read: Some(CharacteristicRead {
            read: true,
            fun: Box::new(move |_req: CharacteristicReadRequest| {
                read_auth(read_service.clone()).boxed()
            }),
            ..Default::default()
        }),
        write: Some(CharacteristicWrite {
            write: true,
            method: CharacteristicWriteMethod::Fun(Box::new(
                move |value: Vec<u8>, _req: CharacteristicWriteRequest| {
                    write_passkey(write_service.clone(), value).boxed()
                },
            )),
            ..Default::default()
        }),
        notify: Some(CharacteristicNotify {
            notify: true,
            method: CharacteristicNotifyMethod::Fun(Box::new(
                move |notifier: CharacteristicNotifier| {
                    notify_auth(notify_service.clone(), notifier, notify_period).boxed()
                },
            )),
            ..Default::default()
        }),
        descriptors: vec![description(
            AUTHENTICATION_DESCRIPTION,
            descriptions::AUTHENTICATION,
        )],
        ..Default::default()
    }
}

async fn read_auth<S: TemperatureSensor>(service: SmokService<S>) -> Result<Vec<u8>, ReqError> {
    Ok(service.auth_value().await)
}

// A wrong passkey is not reported to the client
async fn write_passkey<S: TemperatureSensor>(
    service: SmokService<S>,
    value: Vec<u8>,
) -> Result<(), ReqError> {
    service.submit_passkey(value).await;

    Ok(())
}

async fn notify_auth<S: TemperatureSensor + 'static>(
    service: SmokService<S>,
    notifier: impl NotifySink,
    period: Duration,
) {
    debug!("Client subscribed to authentication status");

    notify_every(notifier, period, move || {
        let service = service.clone();
        async move { Some(service.auth_value().await) }
    })
    .await;
}

fn wifi_config<S>(service: &SmokService<S>) -> Characteristic
where
    S: TemperatureSensor + 'static,
{
    let service = service.clone();

    Characteristic {
        uuid: WIFI_CONFIG,
        write: Some(CharacteristicWrite {
            write: true,
            method: CharacteristicWriteMethod::Fun(Box::new(
                move |value: Vec<u8>, _req: CharacteristicWriteRequest| {
                    write_wifi(service.clone(), value).boxed()
                },
            )),
            ..Default::default()
        }),
        descriptors: vec![description(WIFI_DESCRIPTION, descriptions::WIFI_CONFIG)],
        ..Default::default()
    }
}

async fn write_wifi<S: TemperatureSensor>(
    service: SmokService<S>,
    value: Vec<u8>,
) -> Result<(), ReqError> {
    match service.configure_wifi(&value).await {
        Ok(WifiOutcome::Ignored) => {
            debug!("Dropped Wi-Fi configuration, operations are not enabled");
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(err @ WifiError::Io(_)) => {
            error!("{err}");
            Err(ReqError::Failed)
        }
        Err(err) => {
            warn!("Rejected Wi-Fi configuration: {err}");
            Err(ReqError::Failed)
        }
    }
}

fn temperature<S>(service: &SmokService<S>, notify_period: Duration) -> Characteristic
where
    S: TemperatureSensor + 'static,
{
    let read_service = service.clone();
    let notify_service = service.clone();

    Characteristic {
        uuid: TEMPERATURE,
        read: Some(CharacteristicRead {
            read: true,
            fun: Box::new(move |_req: CharacteristicReadRequest| {
                read_temperature(read_service.clone()).boxed()
            }),
            ..Default::default()
        }),
        notify: Some(CharacteristicNotify {
            notify: true,
            method: CharacteristicNotifyMethod::Fun(Box::new(
                move |notifier: CharacteristicNotifier| {
                    notify_temperature(notify_service.clone(), notifier, notify_period).boxed()
                },
            )),
            ..Default::default()
        }),
        descriptors: vec![description(USER_DESCRIPTION, descriptions::TEMPERATURE)],
        ..Default::default()
    }
}

// Empty value while operations are not enabled
async fn read_temperature<S: TemperatureSensor>(
    service: SmokService<S>,
) -> Result<Vec<u8>, ReqError> {
    match service.read_temperature().await {
        Ok(value) => Ok(value.map(String::into_bytes).unwrap_or_default()),
        Err(err) => {
            error!("{err}");
            Err(ReqError::Failed)
        }
    }
}

async fn notify_temperature<S: TemperatureSensor + 'static>(
    service: SmokService<S>,
    notifier: impl NotifySink,
    period: Duration,
) {
    if !service.is_authenticated().await {
        debug!("Ignored temperature subscription, operations are not enabled");
        return;
    }

    debug!("Client subscribed to temperature");

    notify_every(notifier, period, move || {
        let service = service.clone();
        async move {
            match service.read_temperature().await {
                Ok(value) => value.map(String::into_bytes),
                Err(err) => {
                    error!("{err}");
                    None
                }
            }
        }
    })
    .await;
}

fn unit<S>(service: &SmokService<S>) -> Characteristic
where
    S: TemperatureSensor + 'static,
{
    let read_service = service.clone();
    let write_service = service.clone();

    Characteristic {
        uuid: UNIT,
        read: Some(CharacteristicRead {
            read: true,
            fun: Box::new(move |_req: CharacteristicReadRequest| {
                read_unit(read_service.clone()).boxed()
            }),
            ..Default::default()
        }),
        write: Some(CharacteristicWrite {
            write: true,
            method: CharacteristicWriteMethod::Fun(Box::new(
                move |value: Vec<u8>, _req: CharacteristicWriteRequest| {
                    write_unit(write_service.clone(), value).boxed()
                },
            )),
            ..Default::default()
        }),
        descriptors: vec![description(USER_DESCRIPTION, descriptions::UNIT)],
        ..Default::default()
    }
}

async fn read_unit<S: TemperatureSensor>(service: SmokService<S>) -> Result<Vec<u8>, ReqError> {
    Ok(service
        .read_unit()
        .await
        .map(|code| vec![code as u8])
        .unwrap_or_default())
}

async fn write_unit<S: TemperatureSensor>(
    service: SmokService<S>,
    value: Vec<u8>,
) -> Result<(), ReqError> {
    if service.write_unit(&value).await.is_none() {
        debug!("Ignored unit write {value:?}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use smok_common::sensor::SensorError;
    use smok_common::wifi::WifiConfigurator;
    use tokio::time::Instant;

    use super::*;

    const PERIOD: Duration = Duration::from_secs(4);

    struct FixedSensor(f64);

    #[async_trait]
    impl TemperatureSensor for FixedSensor {
        async fn celsius(&self) -> Result<f64, SensorError> {
            Ok(self.0)
        }
    }

    struct BrokenSensor;

    #[async_trait]
    impl TemperatureSensor for BrokenSensor {
        async fn celsius(&self) -> Result<f64, SensorError> {
            Err(SensorError::Parse("garbage".into()))
        }
    }

    /// Records when each value went out, relative to its creation
    #[derive(Clone)]
    struct RecordingSink {
        start: Instant,
        sent: Arc<Mutex<Vec<(Duration, Vec<u8>)>>>,
        stopped: Arc<AtomicBool>,
        stall_first: Option<Duration>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                sent: Arc::default(),
                stopped: Arc::default(),
                stall_first: None,
            }
        }

        fn unsubscribe(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }

        fn sent(&self) -> Vec<(Duration, Vec<u8>)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotifySink for RecordingSink {
        fn is_stopped(&self) -> bool {
            self.stopped.load(Ordering::SeqCst)
        }

        async fn send(&mut self, value: Vec<u8>) -> io::Result<()> {
            let first = {
                let mut sent = self.sent.lock().unwrap();
                sent.push((self.start.elapsed(), value));
                sent.len() == 1
            };

            if let (true, Some(stall)) = (first, self.stall_first) {
                time::sleep(stall).await;
            }

            Ok(())
        }
    }

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        let dir = std::env::temp_dir().join(format!(
            "smok-daemon-{name}-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).unwrap();

        dir
    }

    fn service_with<S: TemperatureSensor>(sensor: S, dir: &Path) -> SmokService<S> {
        SmokService::new(
            DEFAULT_PASSKEY,
            sensor,
            WifiConfigurator::new(dir.join("wpa_supplicant.conf"), "DE"),
        )
    }

    async fn authenticated<S: TemperatureSensor>(sensor: S) -> SmokService<S> {
        let service = service_with(sensor, &scratch_dir("notify"));
        service.submit_passkey(DEFAULT_PASSKEY).await;

        service
    }

    #[tokio::test(start_paused = true)]
    async fn temperature_is_published_right_away_then_every_period() {
        let sink = RecordingSink::new();
        let service = authenticated(FixedSensor(20.)).await;

        let session = tokio::spawn(notify_temperature(service, sink.clone(), PERIOD));
        time::sleep(Duration::from_millis(8500)).await;

        let sent = sink.sent();
        let offsets = sent.iter().map(|(at, _)| *at).collect::<Vec<_>>();
        assert_eq!(offsets, [Duration::ZERO, PERIOD, PERIOD * 2]);
        assert!(sent.iter().all(|(_, value)| value == b"68.0 F"));

        sink.unsubscribe();
        time::sleep(PERIOD).await;

        assert!(session.is_finished());
        assert_eq!(sink.sent().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unauthenticated_temperature_subscription_ends_at_once() {
        let sink = RecordingSink::new();
        let service = service_with(FixedSensor(20.), &scratch_dir("notify-unauth"));

        notify_temperature(service, sink.clone(), PERIOD).await;

        assert!(sink.sent().is_empty());
        assert_eq!(sink.start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_failure_skips_the_tick_and_keeps_the_subscription() {
        let sink = RecordingSink::new();
        let service = authenticated(BrokenSensor).await;

        let session = tokio::spawn(notify_temperature(service, sink.clone(), PERIOD));
        time::sleep(Duration::from_millis(12_500)).await;

        assert!(sink.sent().is_empty());
        assert!(!session.is_finished());

        sink.unsubscribe();
        time::sleep(PERIOD).await;
        assert!(session.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_value_skips_only_that_tick() {
        let sink = RecordingSink::new();
        let mut ticks = 0;

        let session = tokio::spawn(notify_every(sink.clone(), PERIOD, move || {
            ticks += 1;
            let value = (ticks % 2 == 1).then(|| vec![ticks]);
            async move { value }
        }));
        time::sleep(Duration::from_millis(8500)).await;

        assert_eq!(
            sink.sent(),
            [(Duration::ZERO, vec![1]), (PERIOD * 2, vec![3])]
        );

        sink.unsubscribe();
        time::sleep(PERIOD).await;
        assert!(session.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_client_does_not_get_a_burst() {
        let mut sink = RecordingSink::new();
        sink.stall_first = Some(Duration::from_secs(10));

        tokio::spawn(notify_every(sink.clone(), PERIOD, || async {
            Some(b"1".to_vec())
        }));
        time::sleep(Duration::from_secs(19)).await;

        let offsets = sink.sent().iter().map(|(at, _)| *at).collect::<Vec<_>>();
        assert_eq!(
            offsets,
            [
                Duration::ZERO,
                Duration::from_secs(10),
                Duration::from_secs(14),
                Duration::from_secs(18)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn auth_status_is_published_before_and_after_login() {
        let sink = RecordingSink::new();
        let service = service_with(FixedSensor(20.), &scratch_dir("notify-auth"));

        tokio::spawn(notify_auth(service.clone(), sink.clone(), PERIOD));
        time::sleep(Duration::from_millis(500)).await;
        service.submit_passkey(DEFAULT_PASSKEY).await;
        time::sleep(PERIOD).await;

        let values = sink
            .sent()
            .into_iter()
            .map(|(_, value)| value)
            .collect::<Vec<_>>();
        assert_eq!(values, [b"0".to_vec(), b"1".to_vec()]);
    }

    #[tokio::test]
    async fn unauthenticated_reads_are_empty() {
        let service = service_with(FixedSensor(20.), &scratch_dir("reads"));

        assert_eq!(read_temperature(service.clone()).await.unwrap(), b"");
        assert_eq!(read_unit(service.clone()).await.unwrap(), b"");
        assert_eq!(read_auth(service.clone()).await.unwrap(), b"0");

        write_passkey(service.clone(), b"1234".to_vec()).await.unwrap();

        assert_eq!(read_temperature(service.clone()).await.unwrap(), b"68.0 F");
        assert_eq!(read_unit(service.clone()).await.unwrap(), b"F");
        assert_eq!(read_auth(service).await.unwrap(), b"1");
    }

    #[tokio::test]
    async fn wrong_passkey_write_still_succeeds() {
        let service = service_with(FixedSensor(20.), &scratch_dir("passkey"));

        assert!(write_passkey(service.clone(), b"0000".to_vec()).await.is_ok());
        assert!(!service.is_authenticated().await);
    }

    #[tokio::test]
    async fn unit_write_is_applied_once_authenticated() {
        let service = service_with(FixedSensor(20.), &scratch_dir("unit"));

        write_unit(service.clone(), b"C".to_vec()).await.unwrap();
        service.submit_passkey(DEFAULT_PASSKEY).await;
        assert_eq!(read_unit(service.clone()).await.unwrap(), b"F");

        write_unit(service.clone(), b"C".to_vec()).await.unwrap();
        assert_eq!(read_unit(service.clone()).await.unwrap(), b"C");
        assert_eq!(read_temperature(service).await.unwrap(), b"20.0 C");
    }

    #[tokio::test]
    async fn sensor_failure_fails_the_read() {
        let service = authenticated(BrokenSensor).await;

        assert!(matches!(
            read_temperature(service).await,
            Err(ReqError::Failed)
        ));
    }

    #[tokio::test]
    async fn wifi_write_errors_map_to_failed() {
        let dir = scratch_dir("wifi");
        let path = dir.join("wpa_supplicant.conf");
        let service = service_with(FixedSensor(20.), &dir);

        // Dropped silently before login
        assert!(write_wifi(service.clone(), b"malformed".to_vec()).await.is_ok());

        service.submit_passkey(DEFAULT_PASSKEY).await;

        assert!(matches!(
            write_wifi(service.clone(), b"malformed".to_vec()).await,
            Err(ReqError::Failed)
        ));
        assert!(matches!(
            write_wifi(service.clone(), b"home$short".to_vec()).await,
            Err(ReqError::Failed)
        ));
        assert!(!path.exists());

        assert!(write_wifi(service, b"home$secret123".to_vec()).await.is_ok());
        assert!(path.exists());
    }
}
