//! Test and helper mocks for powder_core

/// An analog source that always errors on read; the sampler repeats its last
/// value (0 before any good reading).
pub struct NoopSource;

impl powder_traits::AnalogSource for NoopSource {
    fn read_raw(&mut self) -> Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop source")))
    }

    fn probe(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop source")))
    }
}
