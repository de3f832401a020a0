#![no_main]

use broom_core::{parse_command_line, BroomError, Subcommand};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    match parse_command_line(&format!("/broom {raw}")) {
        Ok(parsed) => {
            if parsed.subcommand == Subcommand::Help {
                assert!(parsed.positional_args.is_empty());
                assert!(parsed.filter_args.is_empty());
            }
        }
        Err(error) => {
            assert!(matches!(error, BroomError::User(_)));
            assert!(!error.user_message().trim().is_empty());
        }
    }
});
