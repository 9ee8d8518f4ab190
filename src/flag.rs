/// Register payloads written alongside the opcodes in [`crate::cmd::Cmd`].
pub struct Flag;
#[allow(missing_docs)]
impl Flag {
    // Driver Output Control (0x01): MUX = 200 lines, then gate scan bits
    pub const DRIVER_OUTPUT_MUX_LOW: u8 = 0xC7; // (200 - 1) & 0xFF
    pub const DRIVER_OUTPUT_MUX_HIGH: u8 = 0x00;
    pub const DRIVER_OUTPUT_GATE_SCAN: u8 = 0x02;

    // Data Entry Mode (0x11)
    pub const DATA_ENTRY_DECRY_INCRX: u8 = 0x01; // Y decrement, X increment

    // Deep Sleep Mode (0x10)
    pub const DEEP_SLEEP_MODE_1: u8 = 0x01;

    // Temperature Sensor Control (0x18)
    pub const INTERNAL_TEMP_SENSOR: u8 = 0x80;

    // Border Waveform Control (0x3C): follow LUT, LUT1
    pub const BORDER_WAVEFORM_FOLLOW_LUT1: u8 = 0x05;

    // Display Update Control 1 (0x21): normal RAM content, source output S8..S167
    pub const DISPLAY_UPDATE_CTRL1_NORMAL: [u8; 2] = [0x00, 0x80];

    // Display Update Control 2 (0x22)
    pub const DISPLAY_MODE_PARTIAL: u8 = 0xFE; // partial waveform, no full clean
    pub const DISPLAY_MODE_CLEAN_FULL: u8 = 0xF6; // full clean waveform

    // RAM fill used by the flash pass of a fast-full update
    pub const RAM_ALL_WHITE: u8 = 0xFF;
}
