//! # Tinyfs CLI Entry Point
//!
//! Command-line client for the tinyfs file-storage service.
//!
//! ## Usage
//!
//! ```bash
//! # List stored files
//! tinyfs -n 127.0.0.1:7100 list -p 1 -s 10
//!
//! # Write a local file, print its short url
//! tinyfs -n 127.0.0.1:7100 write ./test.txt
//!
//! # Read a file back to stdout (or into a local file)
//! tinyfs -n 127.0.0.1:7100 read sIxFt4
//! tinyfs -n 127.0.0.1:7100 read sIxFt4 -o ./copy.txt
//!
//! # Delete file data / remove file records
//! tinyfs -n 127.0.0.1:7100 delete sIxFt4
//! tinyfs -n 127.0.0.1:7100 remove sIxFt4
//! ```
//!
//! Several `-n` flags may be given; requests are spread across the master
//! nodes at random.

use anyhow::{bail, Context, Result};
use argh::FromArgs;

use tinyfs_client::FsClient;
use tinyfs_common::{ReadFileReq, ReadMultiFilesReq, WriteFileReq};

#[derive(FromArgs)]
/// tinyfs - client for the tinyfs file-storage service
struct Cli {
    /// master node address (host:port); may be given multiple times
    #[argh(option, short = 'n', long = "node")]
    nodes: Vec<String>,

    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    List(ListArgs),
    Read(ReadArgs),
    Write(WriteArgs),
    Delete(DeleteArgs),
    Remove(RemoveArgs),
}

/// Arguments for listing stored files.
#[derive(FromArgs)]
#[argh(subcommand, name = "list")]
/// list stored files
struct ListArgs {
    /// page number, starting at 1
    #[argh(option, short = 'p', default = "1")]
    page: u32,

    /// number of entries per page
    #[argh(option, short = 's', long = "page-size", default = "10")]
    page_size: u32,
}

/// Arguments for reading files back.
#[derive(FromArgs)]
#[argh(subcommand, name = "read")]
/// read one or more files
struct ReadArgs {
    /// short urls of the files to read
    #[argh(positional)]
    short_urls: Vec<String>,

    /// write the (first) file's data here instead of stdout
    #[argh(option, short = 'o', long = "output")]
    output: Option<std::path::PathBuf>,
}

/// Arguments for storing a local file.
#[derive(FromArgs)]
#[argh(subcommand, name = "write")]
/// store a local file
struct WriteArgs {
    /// path of the local file to store
    #[argh(positional)]
    path: std::path::PathBuf,

    /// content type recorded with the file
    #[argh(option, short = 't', long = "type", default = "\"application/octet-stream\".into()")]
    content_type: String,
}

/// Arguments for deleting file data.
#[derive(FromArgs)]
#[argh(subcommand, name = "delete")]
/// delete file data for the given short urls
struct DeleteArgs {
    /// short urls of the files to delete
    #[argh(positional)]
    short_urls: Vec<String>,
}

/// Arguments for removing file records.
#[derive(FromArgs)]
#[argh(subcommand, name = "remove")]
/// remove file records for the given short urls
struct RemoveArgs {
    /// short urls of the records to remove
    #[argh(positional)]
    short_urls: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Default log level INFO, overridable via RUST_LOG.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if cli.nodes.is_empty() {
        bail!("at least one master node is required (-n host:port)");
    }

    let client = FsClient::new();
    for node in &cli.nodes {
        if let Err(e) = client.add_node(node).await {
            // The node stays pooled even when the first connect fails;
            // warn and keep going so one dead master doesn't block the run.
            tracing::warn!(node = %node, error = %e, "failed to connect master node");
        }
    }

    let result = run(&client, cli.command).await;
    client.shutdown();
    result
}

async fn run(client: &FsClient, command: Commands) -> Result<()> {
    match command {
        Commands::List(args) => {
            let resp = client.list_files(args.page, args.page_size).await?;
            tracing::info!("{} files total", resp.total);
            for info in &resp.list {
                println!("{}\t{}\t{}\t{}", info.short_url, info.name, info.content_type, info.size);
            }
        }
        Commands::Read(args) => {
            if args.short_urls.is_empty() {
                bail!("at least one short url is required");
            }
            if args.short_urls.len() == 1 {
                let resp = client
                    .read_file(&ReadFileReq::whole(args.short_urls[0].clone()))
                    .await?;
                match args.output {
                    Some(path) => {
                        std::fs::write(&path, &resp.data)
                            .with_context(|| format!("writing {}", path.display()))?;
                        tracing::info!("{} bytes written to {}", resp.data.len(), path.display());
                    }
                    None => {
                        use std::io::Write;
                        std::io::stdout().write_all(&resp.data)?;
                    }
                }
            } else {
                let resp = client
                    .read_multi_files(&ReadMultiFilesReq {
                        short_urls: args.short_urls,
                    })
                    .await?;
                for file in &resp.list {
                    println!("{}\t{}\t{} bytes", file.name, file.content_type, file.size);
                }
            }
        }
        Commands::Write(args) => {
            let data = std::fs::read(&args.path)
                .with_context(|| format!("reading {}", args.path.display()))?;
            let name = args
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unnamed")
                .to_string();
            let resp = client
                .write_file(&WriteFileReq {
                    name,
                    content_type: args.content_type,
                    size: data.len() as i64,
                    data,
                })
                .await?;
            println!("{}", resp.short_url);
        }
        Commands::Delete(args) => {
            client.delete_files(&args.short_urls).await?;
            tracing::info!("{} file(s) deleted", args.short_urls.len());
        }
        Commands::Remove(args) => {
            client.remove_files(&args.short_urls).await?;
            tracing::info!("{} record(s) removed", args.short_urls.len());
        }
    }
    Ok(())
}
