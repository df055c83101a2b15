use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use cryptex::{
    BatchReport, CryptexError, FolderOptions, Home, KdfParams, Open, Outcome, Passphrase, Seal,
    default_home, keys, pager, transform,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Args)]
struct Argon2Args {
    /// Argon2 memory cost in KiB for --aes (default: 65536, max: 4194304)
    #[arg(long = "argon-mem")]
    mem_cost_kib: Option<u32>,

    /// Argon2 time cost / iterations for --aes (default: 3, max: 16)
    #[arg(long = "argon-time")]
    time_cost: Option<u32>,

    /// Argon2 parallelism for --aes (default: 1, max: 16)
    #[arg(long = "argon-parallelism")]
    parallelism: Option<u32>,
}

impl Argon2Args {
    fn to_kdf_params(&self) -> Result<KdfParams> {
        let default = KdfParams::default();

        Ok(KdfParams::new(
            self.mem_cost_kib.unwrap_or(default.mem_cost_kib()),
            self.time_cost.unwrap_or(default.time_cost()),
            self.parallelism.unwrap_or(default.parallelism()),
        )?)
    }
}

#[derive(Debug, Parser)]
#[command(name = "cryptex")]
#[command(
    version,
    about = "Encrypt files and folders with an RSA key pair or a passphrase."
)]
struct Cli {
    /// Print debug information
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the default key pair and cryptex.toml
    #[arg(long, global = true, value_name = "PATH", env = "CRYPTEX_HOME")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a file, or every file of a folder
    #[command(arg_required_else_help = true)]
    Encrypt {
        file: PathBuf,

        /// RSA public key to encrypt for
        #[arg(long, value_name = "PATH")]
        pubkey: Option<PathBuf>,

        /// Keep the original file
        #[arg(short, long)]
        keep: bool,

        /// For a folder, skip its subfolders
        #[arg(long)]
        no_nested: bool,

        /// Encrypt with a passphrase instead of the key pair
        #[arg(long)]
        aes: bool,

        #[command(flatten)]
        argon2: Argon2Args,
    },

    /// Decrypts a file, or every encrypted file of a folder
    #[command(arg_required_else_help = true)]
    Decrypt {
        file: PathBuf,

        /// RSA private key to decrypt with
        #[arg(long, value_name = "PATH")]
        privkey: Option<PathBuf>,

        /// Keep the encrypted file
        #[arg(short, long)]
        keep: bool,

        /// Show the decrypted content in the configured pager instead of writing it
        #[arg(short, long)]
        pager: bool,

        /// For a folder, skip its subfolders
        #[arg(long)]
        no_nested: bool,

        /// Decrypt a file encrypted with --aes
        #[arg(long)]
        aes: bool,
    },

    /// Creates a key pair in the home directory
    CreateKeys {
        /// Protect the private key with a passphrase
        #[arg(long)]
        passphrase: bool,

        /// Replace an existing key pair
        #[arg(long)]
        force: bool,
    },

    /// Creates cryptex.toml in the home directory if it doesn't exist
    CreateConfig,

    /// Shows the content of cryptex.toml
    Config,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "cryptex=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .init();
}

fn resolve_home(path: Option<PathBuf>) -> Result<Home> {
    match path {
        Some(p) => Ok(Home::new(p)),
        None => Ok(default_home()?),
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if matches!(e.downcast_ref::<CryptexError>(), Some(CryptexError::Authentication)) {
                eprintln!(
                    "The wrong key or passphrase may have been used. Try the private key \
                     matching the public key the file was encrypted with."
                );
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<()> {
    let home = resolve_home(args.home)?;
    debug!(home = %home.dir().display(), "resolved home");

    match args.command {
        Commands::Encrypt {
            file,
            pubkey,
            keep,
            no_nested,
            aes,
            argon2,
        } => {
            if !path_exists(&file) {
                return Ok(());
            }
            let opts = FolderOptions {
                remove_source: !keep,
                nested: !no_nested,
            };

            if aes {
                let kdf = argon2.to_kdf_params()?;
                let passphrase =
                    Passphrase::with_kdf(auth::read_new_passphrase_with_confirmation()?, kdf);
                encrypt_path(&file, &passphrase, opts)?;
            } else {
                let settings = home.load_settings()?;
                let key_path = home.public_key_path(pubkey, &settings);
                ensure_key_exists(&key_path, "pubkey")?;

                let public = keys::read_public_key(&key_path)
                    .with_context(|| format!("failed to load {}", key_path.display()))?;
                debug!(key = %key_path.display(), "public key used");
                encrypt_path(&file, &public, opts)?;
            }
        }
        Commands::Decrypt {
            file,
            privkey,
            keep,
            pager,
            no_nested,
            aes,
        } => {
            if !path_exists(&file) {
                return Ok(());
            }
            let settings = home.load_settings()?;
            let opts = FolderOptions {
                remove_source: !keep,
                nested: !no_nested,
            };
            let pager = pager.then_some(settings.pager.as_str());

            if aes {
                let passphrase = Passphrase::new(auth::read_passphrase("Passphrase: ")?);
                decrypt_path(&file, &passphrase, opts, pager)?;
            } else {
                let key_path = home.private_key_path(privkey, &settings);
                ensure_key_exists(&key_path, "privkey")?;
                debug!(key = %key_path.display(), "private key used");

                let key_bytes = keys::read_key_bytes(&key_path)?;
                let passphrase = if keys::is_passphrase_protected(&key_bytes)
                    .with_context(|| format!("failed to load {}", key_path.display()))?
                {
                    Some(auth::read_passphrase("Please insert your passphrase: ")?)
                } else {
                    None
                };

                let private = keys::load_private_key(
                    &key_bytes,
                    passphrase.as_deref().map(String::as_str),
                )
                .with_context(|| format!("failed to load {}", key_path.display()))?;
                decrypt_path(&file, &private, opts, pager)?;
            }
        }
        Commands::CreateKeys { passphrase, force } => {
            if home.ensure_exists()? {
                println!("home folder created in: {}", home.dir().display());
            }

            let passphrase = if passphrase {
                Some(auth::read_new_passphrase_with_confirmation()?)
            } else {
                None
            };

            match keys::write_keypair(
                home.dir(),
                passphrase.as_deref().map(String::as_str),
                force,
            ) {
                Ok((private, public)) => {
                    println!("New keys created successfully:");
                    println!("  private key: {}", private.display());
                    println!("  public key:  {}", public.display());
                }
                Err(CryptexError::KeysExist(path)) => bail!(
                    "{} already exists; pass --force to replace the key pair \
                     (files encrypted for the old key can then no longer be decrypted)",
                    path.display()
                ),
                Err(e) => return Err(e.into()),
            }
        }
        Commands::CreateConfig => {
            let path = home.config_path();
            if home.create_config()? {
                println!("cryptex.toml created in: {}", path.display());
            } else {
                println!("nothing to do, {} already exists", path.display());
            }
        }
        Commands::Config => match home.read_config()? {
            Some(content) => {
                println!("{content}");
                println!("config file is read from: {}", home.config_path().display());
            }
            None => println!("nothing to show, cryptex.toml has not been created yet"),
        },
    }

    Ok(())
}

fn path_exists(path: &Path) -> bool {
    if path.exists() {
        return true;
    }
    println!(
        "Nothing to do, file or folder {} doesn't exist!",
        path.display()
    );
    false
}

fn ensure_key_exists(path: &Path, flag: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    bail!(
        "the key is missing in '{}'. If you have your own key pass --{flag}, \
         otherwise create a key pair with: cryptex create-keys",
        path.display()
    )
}

fn encrypt_path<S: Seal + ?Sized>(path: &Path, sealer: &S, opts: FolderOptions) -> Result<()> {
    if path.is_dir() {
        println!(
            "Number of files found in {}: {}",
            path.display(),
            transform::count_files(path, opts.nested)?
        );
        let report = transform::encrypt_folder(path, sealer, opts)?;
        return finish_batch(&report, "encrypted");
    }

    match transform::encrypt_file(path, sealer, opts.into())
        .with_context(|| format!("failed to encrypt {}", path.display()))?
    {
        Outcome::Transformed(output) => {
            println!("File encrypted successfully in {}", output.display())
        }
        Outcome::Unchanged(_) => println!("Nothing to do, file already encrypted!"),
    }
    Ok(())
}

fn decrypt_path<O: Open + ?Sized>(
    path: &Path,
    opener: &O,
    opts: FolderOptions,
    pager: Option<&str>,
) -> Result<()> {
    if path.is_dir() {
        if pager.is_some() {
            println!("--pager only applies to a single file, decrypting to disk");
        }
        println!(
            "Number of files found in {}: {}",
            path.display(),
            transform::count_files(path, opts.nested)?
        );
        let report = transform::decrypt_folder(path, opener, opts)?;
        return finish_batch(&report, "decrypted");
    }

    if let Some(command) = pager {
        return match transform::decrypt_to_memory(path, opener)
            .with_context(|| format!("failed to decrypt {}", path.display()))?
        {
            Some(plaintext) => Ok(pager::page(command, &plaintext)?),
            None => {
                println!("Nothing to do, file is not encrypted!");
                Ok(())
            }
        };
    }

    match transform::decrypt_file(path, opener, opts.into())
        .with_context(|| format!("failed to decrypt {}", path.display()))?
    {
        Outcome::Transformed(output) => {
            println!("File decrypted successfully in {}", output.display())
        }
        Outcome::Unchanged(_) => println!("Nothing to do, file already decrypted!"),
    }
    Ok(())
}

fn finish_batch(report: &BatchReport, verb: &str) -> Result<()> {
    for (path, error) in &report.failed {
        eprintln!("failed: {}: {error}", path.display());
    }

    println!(
        "{} file(s) {verb}, {} unchanged, {} failed",
        report.transformed.len(),
        report.unchanged.len(),
        report.failed.len()
    );

    if !report.is_success() {
        bail!("{} file(s) could not be {verb}", report.failed.len());
    }
    println!("Folder {verb} successfully!");
    Ok(())
}
