use crate::{client::DeviceInfo, targets::Target};

#[derive(Debug, Clone)]
pub enum OperationEvent {
    DiscoverStart,
    TargetDetected {
        index: usize,
        target: Target,
    },
    DiscoverDone {
        count: usize,
    },
    TargetSelected {
        target_id: String,
    },

    HexLoaded {
        bytes: usize,
        segments: usize,
        signed: bool,
    },

    PortOpen {
        port: String,
        baud: u32,
    },
    SyncOk,
    DeviceIdentified {
        info: DeviceInfo,
    },

    Erase,
    ParamErase,
    Chunk {
        index: usize,
        total: usize,
        addr: u16,
        len: usize,
    },
    Verify {
        index: usize,
        total: usize,
        addr: u16,
        len: usize,
    },
    Read {
        addr: u16,
        len: usize,
    },
    Boot,
    Done,
}
