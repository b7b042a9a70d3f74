//! # NIIMBOT Command Codes
//!
//! Request codes, info keys and the rule that maps a request to the code
//! of the reply the printer sends back.
//!
//! ## Reply Codes
//!
//! Replies are not tagged with a request id. The only correlation is the
//! reply code, which is derived from the request:
//!
//! | Request | Reply code |
//! |---------|------------|
//! | most commands | request + 1 |
//! | SET_LABEL_TYPE, SET_LABEL_DENSITY, ALLOW_PRINT_CLEAR, GET_PRINT_STATUS | request + 16 |
//! | GET_INFO | the requested info key |
//!
//! The GET_INFO case is data dependent, so [`Command`] models it as its own
//! variant instead of folding it into a static table.

// ============================================================================
// DEVICE ERROR FRAMES
// ============================================================================

/// Frame type the printer sends when it rejects a command
pub const ERROR_INVALID_COMMAND: u8 = 0xDB;

/// Frame type the printer sends for a command its firmware lacks
pub const ERROR_NOT_SUPPORTED: u8 = 0x00;

// ============================================================================
// REQUEST CODES
// ============================================================================

/// Request codes understood by the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestCode {
    GetInfo = 0x40,
    GetRfid = 0x1A,
    Heartbeat = 0xDC,
    SetLabelType = 0x23,
    SetLabelDensity = 0x21,
    StartPrint = 0x01,
    EndPrint = 0xF3,
    StartPagePrint = 0x03,
    EndPagePrint = 0xE3,
    AllowPrintClear = 0x20,
    SetDimension = 0x13,
    SetQuantity = 0x15,
    GetPrintStatus = 0xA3,
    /// One raster row; never acknowledged
    PrintBitmapRow = 0x85,
}

impl RequestCode {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Offset between this request and its reply code.
    fn reply_offset(self) -> u8 {
        match self {
            RequestCode::SetLabelType
            | RequestCode::SetLabelDensity
            | RequestCode::AllowPrintClear
            | RequestCode::GetPrintStatus => 16,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RequestCode::GetInfo => "GET_INFO",
            RequestCode::GetRfid => "GET_RFID",
            RequestCode::Heartbeat => "HEARTBEAT",
            RequestCode::SetLabelType => "SET_LABEL_TYPE",
            RequestCode::SetLabelDensity => "SET_LABEL_DENSITY",
            RequestCode::StartPrint => "START_PRINT",
            RequestCode::EndPrint => "END_PRINT",
            RequestCode::StartPagePrint => "START_PAGE_PRINT",
            RequestCode::EndPagePrint => "END_PAGE_PRINT",
            RequestCode::AllowPrintClear => "ALLOW_PRINT_CLEAR",
            RequestCode::SetDimension => "SET_DIMENSION",
            RequestCode::SetQuantity => "SET_QUANTITY",
            RequestCode::GetPrintStatus => "GET_PRINT_STATUS",
            RequestCode::PrintBitmapRow => "PRINT_BITMAP_ROW",
        }
    }
}

// ============================================================================
// INFO KEYS
// ============================================================================

/// Keys accepted by GET_INFO.
///
/// The printer answers with a frame whose type is the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InfoKey {
    Density = 1,
    PrintSpeed = 2,
    LabelType = 3,
    LanguageType = 6,
    AutoShutdownTime = 7,
    DeviceType = 8,
    SoftVersion = 9,
    Battery = 10,
    DeviceSerial = 11,
    HardVersion = 12,
    Unknown1 = 13,
    Unknown2 = 15,
}

impl InfoKey {
    pub const ALL: [InfoKey; 12] = [
        InfoKey::Density,
        InfoKey::PrintSpeed,
        InfoKey::LabelType,
        InfoKey::LanguageType,
        InfoKey::AutoShutdownTime,
        InfoKey::DeviceType,
        InfoKey::SoftVersion,
        InfoKey::Battery,
        InfoKey::DeviceSerial,
        InfoKey::HardVersion,
        InfoKey::Unknown1,
        InfoKey::Unknown2,
    ];

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            InfoKey::Density => "density",
            InfoKey::PrintSpeed => "print_speed",
            InfoKey::LabelType => "label_type",
            InfoKey::LanguageType => "language_type",
            InfoKey::AutoShutdownTime => "auto_shutdown_time",
            InfoKey::DeviceType => "device_type",
            InfoKey::SoftVersion => "soft_version",
            InfoKey::Battery => "battery",
            InfoKey::DeviceSerial => "device_serial",
            InfoKey::HardVersion => "hard_version",
            InfoKey::Unknown1 => "unknown_1",
            InfoKey::Unknown2 => "unknown_2",
        }
    }
}

// ============================================================================
// COMMAND (REQUEST + REPLY CODE)
// ============================================================================

/// A request whose reply code can be derived before it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Reply code is a fixed offset from the request code
    Static(RequestCode),
    /// GET_INFO: reply code equals the requested key
    Info(InfoKey),
}

impl Command {
    pub fn request(self) -> RequestCode {
        match self {
            Command::Static(code) => code,
            Command::Info(_) => RequestCode::GetInfo,
        }
    }

    pub fn reply_code(self) -> u8 {
        match self {
            Command::Static(code) => code.code().wrapping_add(code.reply_offset()),
            Command::Info(key) => key.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reply_offset() {
        assert_eq!(Command::Static(RequestCode::StartPrint).reply_code(), 0x02);
        assert_eq!(Command::Static(RequestCode::EndPrint).reply_code(), 0xF4);
        assert_eq!(Command::Static(RequestCode::SetDimension).reply_code(), 0x14);
        assert_eq!(Command::Static(RequestCode::Heartbeat).reply_code(), 0xDD);
    }

    #[test]
    fn test_plus_sixteen_reply_offset() {
        assert_eq!(Command::Static(RequestCode::SetLabelType).reply_code(), 0x33);
        assert_eq!(Command::Static(RequestCode::SetLabelDensity).reply_code(), 0x31);
        assert_eq!(Command::Static(RequestCode::AllowPrintClear).reply_code(), 0x30);
        assert_eq!(Command::Static(RequestCode::GetPrintStatus).reply_code(), 0xB3);
    }

    #[test]
    fn test_info_reply_code_is_key() {
        for key in InfoKey::ALL {
            let cmd = Command::Info(key);
            assert_eq!(cmd.request(), RequestCode::GetInfo);
            assert_eq!(cmd.reply_code(), key.code());
        }
    }
}
