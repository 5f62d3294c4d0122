use crate::config::CmdId;

/// Per-command flags of one reconciliation, indexed by arena position.
///
/// Commands of the device are `needed` when they were equalized with a
/// target command or already deleted, and `to_delete` when they lost
/// their last known reference. Target commands are `ready` once they were
/// found on device or transferred.
#[derive(Debug, Default)]
pub(crate) struct Flags {
    needed: Vec<bool>,
    to_delete: Vec<bool>,
    ready: Vec<bool>,
}

impl Flags {
    pub fn new(device_len: usize, target_len: usize) -> Self {
        Self {
            needed: vec![false; device_len],
            to_delete: vec![false; device_len],
            ready: vec![false; target_len],
        }
    }

    pub fn needed(&self, id: CmdId) -> bool {
        self.needed[id.0]
    }

    pub fn set_needed(&mut self, id: CmdId) {
        self.needed[id.0] = true;
    }

    pub fn to_delete(&self, id: CmdId) -> bool {
        self.to_delete[id.0]
    }

    pub fn set_to_delete(&mut self, id: CmdId) {
        self.to_delete[id.0] = true;
    }

    pub fn ready(&self, id: CmdId) -> bool {
        self.ready[id.0]
    }

    pub fn set_ready(&mut self, id: CmdId) {
        self.ready[id.0] = true;
    }
}
