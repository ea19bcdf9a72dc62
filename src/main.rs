use std::sync::Arc;

use clap::Parser;

use frontproxy::config::{Cli, Config};
use frontproxy::listener::{chdir_if_requested, Listener};

fn main() {
    frontproxy::logging::init();

    let cli = Cli::parse();
    let config = match Config::from_cli(cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("frontproxy: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = chdir_if_requested(config.dir.as_ref()) {
        eprintln!("frontproxy: {e}");
        std::process::exit(1);
    }

    let listener = match &config.unix_socket {
        Some(path) => Listener::bind_unix(path),
        None => Listener::bind_tcp(&config.host, &config.port),
    };
    let listener = match listener {
        Ok(l) => l,
        Err(e) => {
            eprintln!("frontproxy: {e}");
            std::process::exit(1);
        }
    };

    let routes = Arc::new(config.routes);
    listener.serve(routes, config.worker_limit);
}
