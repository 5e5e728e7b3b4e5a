/// Temperature unit as exchanged on the unit characteristic
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Celsius,
    Fahrenheit,
}

impl Unit {
    /// Parses the first byte of a unit write, case-insensitive
    pub fn from_code(code: u8) -> Option<Self> {
        match code.to_ascii_uppercase() {
            b'C' => Some(Self::Celsius),
            b'F' => Some(Self::Fahrenheit),
            _ => None,
        }
    }

    pub const fn code(self) -> char {
        match self {
            Self::Celsius => 'C',
            Self::Fahrenheit => 'F',
        }
    }

    pub fn convert(self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 1.8 + 32.,
        }
    }
}

/// Flags shared by every characteristic of the service.
///
/// Once `operations_enabled` is set there is no way back, authentication lasts
/// as long as the process does.
#[derive(Clone, Debug)]
pub struct ServiceState {
    operations_enabled: bool,
    fahrenheit: bool,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            operations_enabled: false,
            fahrenheit: true,
        }
    }
}

impl ServiceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn are_operations_enabled(&self) -> bool {
        self.operations_enabled
    }

    pub fn enable_operations(&mut self) {
        self.operations_enabled = true;
    }

    pub fn unit(&self) -> Unit {
        if self.fahrenheit {
            Unit::Fahrenheit
        } else {
            Unit::Celsius
        }
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.fahrenheit = matches!(unit, Unit::Fahrenheit);
    }
}
