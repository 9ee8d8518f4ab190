//! SSD1681 command opcodes used by this driver.

pub struct Cmd;
impl Cmd {
    // Init
    pub const DRIVER_OUTPUT_CTRL: u8 = 0x01;
    pub const BOOSTER_SOFT_START: u8 = 0x0C;
    pub const DEEP_SLEEP_MODE: u8 = 0x10;
    pub const DATA_ENTRY_MODE: u8 = 0x11;
    pub const SW_RESET: u8 = 0x12;
    pub const TEMP_CONTROL: u8 = 0x18;
    pub const BORDER_WAVEFORM_CTRL: u8 = 0x3C;

    // Update
    pub const MASTER_ACTIVATE: u8 = 0x20;
    pub const DISPLAY_UPDATE_CTRL1: u8 = 0x21;
    pub const DISPLAY_UPDATE_CTRL2: u8 = 0x22;
    pub const WRITE_BW_DATA: u8 = 0x24;
    pub const WRITE_RED_DATA: u8 = 0x26;
    pub const STATUS_BIT_READ: u8 = 0x2F;

    // RAM addressing
    pub const SET_RAMX_START_END: u8 = 0x44;
    pub const SET_RAMY_START_END: u8 = 0x45;
    pub const SET_RAMX_COUNTER: u8 = 0x4E;
    pub const SET_RAMY_COUNTER: u8 = 0x4F;
}
