use crate::doc::id::Stamp;

/// Last-writer-wins string cell. Concurrent assignments resolve to the one
/// with the greatest stamp on every replica.
#[derive(Debug, Clone, Default)]
pub(crate) struct LwwRegister {
    value: Option<(Stamp, String)>,
}

impl LwwRegister {
    pub fn get(&self) -> Option<&str> {
        self.value.as_ref().map(|(_, value)| value.as_str())
    }

    /// Returns true when the visible value changed.
    pub fn assign(&mut self, stamp: Stamp, value: String) -> bool {
        match &self.value {
            Some((current, _)) if *current >= stamp => false,
            Some((_, current)) if *current == value => {
                self.value = Some((stamp, value));
                false
            }
            _ => {
                self.value = Some((stamp, value));
                true
            }
        }
    }
}
