use colored::Colorize;
use s3up::cli::{start, upload};
use std::process;

#[tokio::main]
async fn main() {
    let (s3, action, globals) = match start() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", format!("{e:#}").red());
            process::exit(1);
        }
    };

    match upload::run(s3, action, &globals).await {
        Ok(info) => {
            if let Some(version_id) = info.version_id {
                println!("ETag: {}, version: {version_id}", info.etag);
            } else {
                println!("ETag: {}", info.etag);
            }
        }

        Err(e) => {
            eprintln!("{}", format!("{e:#}").red());
            process::exit(1);
        }
    }
}
