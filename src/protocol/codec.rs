//! Motor command line codec.
//!
//! Wire format:
//! ```text
//! ┌───────────┬───┬────────────┬───┬────┐
//! │ left (i16)│ $ │ right (i16)│ $ │ \n │
//! │ ASCII dec │   │ ASCII dec  │   │    │
//! └───────────┴───┴────────────┴───┴────┘
//! ```
//!
//! Fire-and-forget: the receiver parses two `$`-delimited integers per
//! line and never replies with structured data, so there is no decoder.
//! No escaping, no checksum.

use core::fmt::Write;

use crate::control::MotorCommand;

/// Field delimiter after each wheel value.
pub const FIELD_DELIMITER: char = '$';

/// Line terminator.
pub const TERMINATOR: char = '\n';

/// Widest possible line: `"-32768$-32768$\n"` is 15 bytes.
pub const MAX_LINE_LEN: usize = 16;

/// One encoded command line.
pub type Line = heapless::String<MAX_LINE_LEN>;

/// Encode a left/right pair into a wire line.
///
/// Never fails and never validates; range checks belong to the caller.
pub fn encode(left: i16, right: i16) -> Line {
    let mut line = Line::new();
    // Any pair of i16 values fits in MAX_LINE_LEN.
    let _ = write!(
        line,
        "{left}{FIELD_DELIMITER}{right}{FIELD_DELIMITER}{TERMINATOR}"
    );
    line
}

/// Encode a [`MotorCommand`].
pub fn encode_command(command: MotorCommand) -> Line {
    encode(command.left, command.right)
}
