use clap::Parser;
use mongo_river::{Pipeline, RiverConfig};
use std::path::Path;
use tracing::info;

#[derive(Parser, Debug)]
#[clap(version = env!("CARGO_PKG_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
struct Opts {
    /// specific server to tail.
    #[clap(long, default_value = "localhost")]
    mongo: String,
    /// elasticsearch server to index to.
    #[clap(long, default_value = "http://localhost:9200")]
    es: String,
    /// elasticsearch index to use.
    #[clap(long, default_value = "testing")]
    index: String,
    /// the namespace to tail on.
    #[clap(long, default_value = "api.users")]
    ns: String,
    /// do an initial sync of the full collection before tailing the oplog.
    #[clap(long)]
    initial: bool,
    /// maximum number of simultaneous elasticsearch connections.
    #[clap(long, default_value_t = 1)]
    concurrency: usize,
    /// what file to save progress on for oplog resumes.
    #[clap(long, default_value = "/tmp/mongo_river.db")]
    db: String,
    /// emit periodic counter reports when non-empty.
    #[clap(long, default_value = "")]
    debug: String,
    /// treat $unset updates as null-valued $set entries instead of
    /// re-indexing the full document.
    #[clap(long)]
    unset_as_null: bool,
    /// log file path, if not specified, all log information will be output
    /// to stdout.
    #[clap(long)]
    log_path: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts: Opts = Opts::parse();

    let collector = tracing_subscriber::fmt();
    let (non_blocking, _guard) = match &opts.log_path {
        Some(path) => {
            let path = Path::new(path);
            let dir_name = path.parent().unwrap();
            let file_name = path.file_name().unwrap().to_str().unwrap();
            let file_appender = tracing_appender::rolling::daily(dir_name, file_name);
            tracing_appender::non_blocking(file_appender)
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };
    collector.with_writer(non_blocking).init();

    let mut conf = RiverConfig::new(
        opts.mongo,
        opts.es,
        opts.index,
        opts.ns,
        opts.initial,
        opts.concurrency,
        opts.db,
        opts.debug,
    );
    conf.set_unset_as_null(opts.unset_as_null);

    info!(?conf, "Starting river. ");
    Pipeline::new(conf).run()?;
    Ok(())
}
