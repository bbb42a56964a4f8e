use tessera_animation::{AnimableValue, AnyNumeric, NumericKind};
use tessera_core::{Result, TesseraError};

/// A named numeric property scene animations can drive, such as a light
/// intensity or a material parameter.
///
/// Numeric tracks add weighted deltas to the current value; the scene
/// resets it to the base value before each frame's animations run.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericAnimable {
    name: String,
    base: AnyNumeric,
    current: AnyNumeric,
}

impl NumericAnimable {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<AnyNumeric>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            base: value,
            current: value,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> AnyNumeric {
        self.current
    }

    #[inline]
    #[must_use]
    pub fn base_value(&self) -> AnyNumeric {
        self.base
    }

    /// Sets the current value. The kind cannot change.
    pub fn set_value(&mut self, value: impl Into<AnyNumeric>) -> Result<()> {
        let value = value.into();
        if value.kind() != self.current.kind() {
            return Err(TesseraError::NumericTypeMismatch {
                expected: self.current.kind().name(),
                found: value.kind().name(),
            });
        }
        self.current = value;
        Ok(())
    }
}

impl AnimableValue for NumericAnimable {
    fn value_kind(&self) -> NumericKind {
        self.current.kind()
    }

    fn apply_delta_value(&mut self, delta: &AnyNumeric) -> Result<()> {
        self.current = self.current.checked_add(*delta)?;
        Ok(())
    }

    fn reset_to_base_value(&mut self) {
        self.current = self.base;
    }

    fn set_current_state_as_base_value(&mut self) {
        self.base = self.current;
    }
}
