use clap::Parser;

use uplink::cli::{Cli, Commands, ExecTarget, UpTarget};
use uplink::credentials::AuthOptions;
use uplink::{config, exec, transfer, util};

fn main() {
    util::try_enable_ansi_on_windows();
    let cli = Cli::parse();
    let result = run(cli);
    if let Err(e) = result {
        match e.downcast_ref::<uplink::UploadError>() {
            Some(ue) => {
                eprintln!("❌ {}", ue);
                std::process::exit(ue.exit_code());
            }
            None => {
                eprintln!("❌ {:#}", e);
                std::process::exit(20);
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Up { target } => match target {
            UpTarget::Ssh { source, sftp_url, auth, concurrency, common, json, quiet } => {
                if let Some(ref path) = common.dotenv {
                    config::load_env_file(path)?;
                }
                // guard 存活到进程结束，否则缓冲日志会丢
                let _guard = common.verbose.then(util::init_verbose_logging).flatten();
                transfer::handle_upload(transfer::UploadArgs {
                    source,
                    sftp_url,
                    auth: AuthOptions { key: auth.key, key_path: auth.key_path },
                    concurrency,
                    verbose: common.verbose,
                    json,
                    quiet,
                })
            }
        },
        Commands::Exec { target } => match target {
            ExecTarget::Ssh { ssh_url, commands, auth, common } => {
                if let Some(ref path) = common.dotenv {
                    config::load_env_file(path)?;
                }
                let _guard = common.verbose.then(util::init_verbose_logging).flatten();
                exec::handle_exec(
                    &ssh_url,
                    &commands,
                    &AuthOptions { key: auth.key, key_path: auth.key_path },
                )
            }
        },
    }
}
