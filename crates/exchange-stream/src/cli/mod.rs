/*
[INPUT]:  Sub-command arguments
[OUTPUT]: Sub-command implementations
[POS]:    CLI layer - module wiring
[UPDATE]: When adding sub-commands
*/

pub mod init;
