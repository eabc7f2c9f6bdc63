//! this binary starts the registry server
//! to see the list of options, type: `academia-server --help`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use academia::config::DEFAULT_ADDRESS;
use academia::thread_pool::{SharedQueueThreadPool, ThreadPerConnection, ThreadPool};
use academia::{FileRegistry, RegistryError, RegistryServer, Result, StoreConfig};
use clap::{arg_enum, crate_version, value_t, App, Arg};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

arg_enum! {
    #[allow(non_camel_case_types)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Pool {
        per_connection,
        shared_queue
    }
}

const DEFAULT_POOL: Pool = Pool::per_connection;
const DEFAULT_THREADS: &str = "8";

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    addr: SocketAddr,
    data_dir: PathBuf,
    pool: Pool,
    threads: u32,
    lock_timeout: Option<Duration>,
    seed: bool,
}

impl Opt {
    /// validates the `addr`, `threads` and `lock_timeout` parameters
    /// returns `Ok<Opt>` if everything is valid
    /// # Errors
    /// returns [`RegistryError::Parsing`] if one of the parameters is invalid
    ///
    fn build(
        addr: &str,
        data_dir: &str,
        pool: Pool,
        threads: &str,
        lock_timeout: Option<&str>,
        seed: bool,
    ) -> Result<Opt> {
        let addr: SocketAddr = addr.parse().map_err(|_| {
            RegistryError::Parsing(format!(
                "could not parse {} into an IP address and port",
                &addr
            ))
        })?;
        let threads: u32 = threads
            .parse()
            .map_err(|_| RegistryError::Parsing(format!("{} is not a thread count", threads)))?;
        let lock_timeout = match lock_timeout {
            Some(ms) => Some(Duration::from_millis(ms.parse().map_err(|_| {
                RegistryError::Parsing(format!("{} is not a number of milliseconds", ms))
            })?)),
            None => None,
        };

        Ok(Opt {
            addr,
            data_dir: PathBuf::from(data_dir),
            pool,
            threads,
            lock_timeout,
            seed,
        })
    }
}

fn main() {
    let matches = App::new("academia-server")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("a multi-role course registration server")
        .arg(
            Arg::with_name("addr")
                .long("addr")
                .value_name("IP_ADDR:PORT")
                .help("sets the IP_ADDR:PORT that the server listens on")
                .default_value(DEFAULT_ADDRESS),
        )
        .arg(
            Arg::with_name("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("sets the directory holding the data files")
                .default_value("."),
        )
        .arg(
            Arg::with_name("pool")
                .long("pool")
                .value_name("POOL")
                .help("sets the session thread pool, either 'per_connection' or 'shared_queue'")
                .possible_values(&Pool::variants())
                .default_value("per_connection"),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .value_name("N")
                .help("sets the number of workers of the shared_queue pool")
                .default_value(DEFAULT_THREADS),
        )
        .arg(
            Arg::with_name("lock-timeout-ms")
                .long("lock-timeout-ms")
                .value_name("MS")
                .help(
                    "gives up on a contended data file after MS milliseconds, \
                     waits forever if absent",
                ),
        )
        .arg(
            Arg::with_name("no-seed")
                .long("no-seed")
                .help("does not create the default accounts on an empty user file"),
        )
        .arg(
            Arg::with_name("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("sets the log level: error, warn, info, debug or trace")
                .default_value("info"),
        )
        .get_matches();

    // set up a tracing subscriber to log to STDERR
    let level = value_t!(matches, "log-level", Level).unwrap_or(Level::INFO);
    if let Err(e) = subscriber_config(level) {
        eprintln!("{}", e);
        exit(1);
    }

    let pool = value_t!(matches, "pool", Pool).unwrap_or(DEFAULT_POOL);
    let opt = match Opt::build(
        matches.value_of("addr").unwrap_or(DEFAULT_ADDRESS),
        matches.value_of("data-dir").unwrap_or("."),
        pool,
        matches.value_of("threads").unwrap_or(DEFAULT_THREADS),
        matches.value_of("lock-timeout-ms"),
        !matches.is_present("no-seed"),
    ) {
        Ok(opt) => opt,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    // start the server
    if let Err(e) = run(opt) {
        error!("{}", e);
        eprintln!("{}", e);
        exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    info!("academia-server {}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", opt.data_dir.display());
    info!("Thread pool: {}", opt.pool);

    let mut config = StoreConfig::new(&opt.data_dir);
    if let Some(timeout) = opt.lock_timeout {
        config = config.with_lock_timeout(timeout);
    }
    let engine = FileRegistry::open(config)?;
    if opt.seed && engine.seed_defaults()? {
        info!("Created the default accounts");
    }

    match opt.pool {
        Pool::per_connection => {
            let pool = ThreadPerConnection::new(opt.threads)?;
            run_with_pool(engine, pool, opt.addr)
        }
        Pool::shared_queue => {
            let pool = SharedQueueThreadPool::new(opt.threads)?;
            run_with_pool(engine, pool, opt.addr)
        }
    }
}

fn run_with_pool<P: ThreadPool>(engine: FileRegistry, pool: P, addr: SocketAddr) -> Result<()> {
    let server = RegistryServer::new(engine, pool);
    server.run(addr)
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        // all spans/events at `level` or more severe will be written
        .with_max_level(level)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        RegistryError::Parsing(format!("setting tracing default subscriber failed: {}", e))
    })
}
