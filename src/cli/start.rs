use crate::{
    cli::{
        Config, Host, commands,
        globals::GlobalArgs,
        upload::{Input, Upload},
    },
    s3::{Credentials, S3, checksum::ChecksumAlgorithm},
    stream::{PutOptions, ServerSideEncryption},
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use secrecy::SecretString;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// `~/.config/s3up`, created when missing
///
/// # Errors
///
/// Will return `Err` if the directory can not be created
pub fn get_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));

    let config_path = Path::new(&home_dir).join(".config").join("s3up");
    fs::create_dir_all(&config_path)
        .with_context(|| format!("unable to create: {}", config_path.display()))?;

    Ok(config_path)
}

/// Parse the command line, returns the client, the upload to run and the
/// global arguments.
///
/// # Errors
///
/// Will return `Err` if the arguments or the config file are invalid
pub fn start() -> Result<(S3, Upload, GlobalArgs)> {
    let config_path = get_config_path()?;

    let matches = commands::new(&config_path).get_matches();

    let verbosity_level = match matches.get_count("verbose") {
        0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };

    env_logger::Builder::new()
        .filter_level(verbosity_level)
        .init();

    log::info!("config path: {}", config_path.display());

    let config_file = matches
        .get_one::<PathBuf>("config")
        .context("no config file found")?;

    let config = Config::new(config_file)?;

    log::debug!("hosts: {:?}", config.hosts.keys().collect::<Vec<_>>());

    let (s3, upload, globals) = parse(&matches, &config, config_file)?;

    log::debug!("globals: {globals:#?}, upload: {upload:#?}");

    Ok((s3, upload, globals))
}

fn parse(
    matches: &ArgMatches,
    config: &Config,
    config_file: &Path,
) -> Result<(S3, Upload, GlobalArgs)> {
    let mut globals = GlobalArgs::new();

    if let Some(retries) = matches.get_one::<usize>("retries") {
        globals.set_retries(*retries);
    }

    if let Some(workers) = matches.get_one::<usize>("workers") {
        globals.set_workers(*workers);
    }

    globals.quiet = matches.get_flag("quiet");

    let arguments: Vec<&str> = matches
        .get_many::<String>("arguments")
        .unwrap_or_default()
        .map(String::as_str)
        .collect();

    let (input, location) = match (matches.get_flag("pipe"), arguments.as_slice()) {
        (true, [location]) => (
            Input::Stdin {
                size: matches.get_one::<u64>("size").copied(),
            },
            *location,
        ),

        (false, [file, location]) => (Input::File(PathBuf::from(file)), *location),

        (true, _) => {
            return Err(anyhow!(
                "Missing destination, try: --pipe <s3 provider>/<bucket name>/file"
            ));
        }

        (false, _) => {
            return Err(anyhow!(
                "Missing arguments, try: /path/to/file <s3 provider>/<bucket name>/file"
            ));
        }
    };

    let (host_name, path) = location.split_once('/').unwrap_or((location, ""));

    let host = config.get_host(host_name).map_err(|_| {
        anyhow!(
            "Could not find host: \"{}\". Check config file {}, For more information try {}",
            host_name.red(),
            config_file.display(),
            "--help".green()
        )
    })?;

    let file = match &input {
        Input::File(path) => Some(path.as_path()),
        Input::Stdin { .. } => None,
    };

    let (bucket, key) = bucket_key(path, host, file)?;

    let region = host.get_region()?;

    log::info!("host: {host_name}, region: {region}, bucket: {bucket}, key: {key}");

    let credentials = Credentials::new(&host.access_key, &host.secret_key);

    let s3 = S3::new(&credentials, &region, globals.retries);

    let upload = Upload {
        bucket,
        key,
        input,
        options: put_options(matches)?,
    };

    Ok((s3, upload, globals))
}

/// Split `bucket/key`, a host with a default bucket takes the whole path as
/// the key. An empty key or a trailing `/` uses the file name.
fn bucket_key(path: &str, host: &Host, file: Option<&Path>) -> Result<(String, String)> {
    let (bucket, key) = match &host.bucket {
        Some(bucket) => (bucket.as_str(), path),
        None => path.split_once('/').unwrap_or((path, "")),
    };

    if bucket.is_empty() {
        return Err(anyhow!(
            "No \"bucket\" found, try: <s3 provider>/<bucket name>/file"
        ));
    }

    if key.starts_with('/') {
        return Err(anyhow!("Please remove leading slashes from path."));
    }

    if key.is_empty() || key.ends_with('/') {
        let name = file
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .context("No \"key\" found, try: <s3 provider>/<bucket name>/file")?;

        return Ok((bucket.to_string(), format!("{key}{name}")));
    }

    Ok((bucket.to_string(), key.to_string()))
}

fn put_options(matches: &ArgMatches) -> Result<PutOptions> {
    let mut options = PutOptions {
        part_size: matches.get_one::<u64>("buffer").copied(),
        acl: matches.get_one::<String>("acl").cloned(),
        content_type: matches.get_one::<String>("content-type").cloned(),
        ..Default::default()
    };

    if let Some(checksum) = matches.get_one::<String>("checksum") {
        options.checksum = Some(
            checksum
                .parse::<ChecksumAlgorithm>()
                .map_err(|()| anyhow!("invalid checksum algorithm: {checksum}"))?,
        );
    }

    if let Some(meta) = matches.get_one::<String>("meta") {
        for pair in meta.split(';') {
            if let Some((k, v)) = pair.split_once('=') {
                options.meta.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
    }

    options.encryption = match (
        matches.get_one::<String>("sse").map(String::as_str),
        matches.get_one::<String>("sse-c-key"),
    ) {
        (Some("s3"), _) => Some(ServerSideEncryption::S3),

        (Some(_), _) => Some(ServerSideEncryption::Kms {
            key_id: matches.get_one::<String>("kms-key-id").cloned(),
        }),

        (None, Some(key)) => {
            if key.len() != 32 {
                return Err(anyhow!("SSE-C key must be 32 bytes long"));
            }

            Some(ServerSideEncryption::Customer {
                key: SecretString::from(key.as_str()),
            })
        }

        (None, None) => None,
    };

    Ok(options)
}
