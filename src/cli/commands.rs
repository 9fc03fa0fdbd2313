use crate::s3::limits::DEFAULT_WORKERS;
use bytesize::ByteSize;
use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::ValueParser,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::{fs, path::Path, path::PathBuf};

#[must_use]
pub fn validator_key_value() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<String, String> {
        for pair in s.split(';') {
            if pair.split_once('=').is_none() {
                return Err(String::from("metadata format is key1=value1;key2=value2"));
            }
        }
        Ok(s.to_string())
    })
}

#[must_use]
pub fn validator_is_num() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<usize, String> {
        s.parse::<usize>()
            .map_err(|_| String::from("Not a valid number"))
    })
}

/// Sizes like `10485760`, `16MiB` or `1GB`
#[must_use]
pub fn validator_bytes() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<u64, String> {
        s.parse::<ByteSize>()
            .map(|size| size.as_u64())
            .map_err(|e| format!("Not a valid size: {e}"))
    })
}

#[must_use]
pub fn validator_is_file() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<PathBuf, String> {
        match fs::metadata(s) {
            Ok(metadata) if metadata.is_file() => Ok(PathBuf::from(s)),
            _ => Err(format!("Invalid file path or file does not exist: '{s}'")),
        }
    })
}

#[must_use]
pub fn new(config_path: &Path) -> Command {
    // get config file path (default: ~/.config/s3up/config.yml)
    let config_file_path = config_path.join("config.yml");

    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("s3up")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("config file")
                .default_value(config_file_path.into_os_string())
                .value_parser(validator_is_file())
                .num_args(1),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Verbosity level, -v info, -vv debug")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Don't show progress bar")
                .action(ArgAction::SetTrue),
        )
        .args(args_transfer())
        .args(args_object())
        .args(args_encryption())
        .arg(
            Arg::new("arguments")
                .help("/path/to/file <s3 provider>/<bucket>/<file>")
                .required(true)
                .num_args(1..=2),
        )
}

// input, part size and concurrency
fn args_transfer() -> [Arg; 5] {
    [
        Arg::new("pipe")
            .long("pipe")
            .short('p')
            .help("Read from STDIN")
            .action(ArgAction::SetTrue),
        Arg::new("size")
            .long("size")
            .short('s')
            .help("Size of the STDIN stream when known, example: 512MiB")
            .requires("pipe")
            .value_parser(validator_bytes())
            .num_args(1),
        Arg::new("buffer")
            .long("buffer")
            .short('b')
            .help("Part size, between 5MiB and 5GiB, computed from the object size when not set")
            .env("S3UP_PART_SIZE")
            .value_parser(validator_bytes())
            .num_args(1),
        Arg::new("workers")
            .long("workers")
            .short('w')
            .help("Number of parts uploaded concurrently")
            .default_value(DEFAULT_WORKERS.to_string())
            .value_parser(validator_is_num())
            .num_args(1),
        Arg::new("retries")
            .long("retries")
            .short('r')
            .help("Number of attempts per request")
            .default_value("3")
            .value_parser(validator_is_num())
            .num_args(1),
    ]
}

fn args_object() -> [Arg; 4] {
    [
        Arg::new("checksum")
            .help("Additional checksums algorithms, uploads parts in order")
            .long("checksum")
            .value_parser(["md5", "crc32", "crc32c", "sha1", "sha256"])
            .value_name("algorithm")
            .num_args(1),
        Arg::new("acl")
            .help("The canned ACL to apply to the object example")
            .long("acl")
            .value_parser([
                "private",
                "public-read",
                "public-read-write",
                "authenticated-read",
                "aws-exec-read",
                "bucket-owner-read",
                "bucket-owner-full-control",
            ])
            .short('a')
            .num_args(1),
        Arg::new("meta")
            .long("meta")
            .short('m')
            .help("User-defined object metadata \"x-amz-meta-*\", example: \"key1=value1;key2=value2\"")
            .value_parser(validator_key_value())
            .num_args(1),
        Arg::new("content-type")
            .long("content-type")
            .help("Content-Type of the object")
            .num_args(1),
    ]
}

fn args_encryption() -> [Arg; 3] {
    [
        Arg::new("sse")
            .long("sse")
            .help("Server-side encryption")
            .value_parser(["s3", "kms"])
            .conflicts_with("sse-c-key")
            .num_args(1),
        Arg::new("kms-key-id")
            .long("kms-key-id")
            .help("KMS key for --sse kms")
            .requires("sse")
            .num_args(1),
        Arg::new("sse-c-key")
            .long("sse-c-key")
            .help("Customer provided 256-bit encryption key (SSE-C)")
            .env("S3UP_SSE_C_KEY")
            .hide_env_values(true)
            .num_args(1),
    ]
}
