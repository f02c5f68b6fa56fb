use ves::repository::Repository;
use ves::storage::object_find;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ves")]
#[command(about = "A content-addressed version control system")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new, empty repository
    Init {
        path: Option<PathBuf>,
    },
    /// Compute an object id, optionally storing the file as a blob
    HashObject {
        /// Object type to hash as
        #[arg(short = 't', default_value = "blob")]
        r#type: String,

        /// Actually write the object into the store
        #[arg(short = 'w')]
        write: bool,

        path: PathBuf,
    },
    /// Print the payload of an object
    CatFile {
        r#type: String,
        object: String,
    },
    /// List the contents of a tree object
    LsTree {
        /// Recurse into subtrees
        #[arg(short = 'r')]
        recursive: bool,

        tree: String,
    },
    /// List files tracked by the index
    LsFiles {
        #[arg(long)]
        verbose: bool,
    },
    /// Resolve a name to an object id
    RevParse {
        /// Constrain to an object type (blob, tree, commit, tag)
        #[arg(long = "ves-type")]
        ves_type: Option<String>,

        name: String,
    },
    /// List all references
    ShowRef,
    /// Emit the commit graph as Graphviz DOT
    Log {
        #[arg(default_value = "HEAD")]
        commit: String,
    },
    /// Materialize a commit or tree inside an empty directory
    Checkout {
        commit: String,
        path: PathBuf,
    },
    /// Stage files
    Add {
        paths: Vec<PathBuf>,
    },
    /// Remove files from the index and the working tree
    Rm {
        paths: Vec<PathBuf>,
    },
    /// Show the working tree status
    Status,
    /// Record the staged tree as a new commit
    Commit {
        #[arg(short = 'm')]
        message: String,
    },
    /// List tags, or create one
    Tag {
        /// Create an annotated tag object
        #[arg(short = 'a')]
        annotate: bool,

        name: Option<String>,

        #[arg(default_value = "HEAD")]
        object: String,
    },
    /// Print each given path that the ignore rules match
    CheckIgnore {
        paths: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    let mut stdout = io::stdout();

    match cli.command {
        Commands::Init { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from("."));
            Repository::create(&path)?;
            println!("Initialized empty ves repository in {}/.ves", path.display());
        }

        Commands::HashObject { r#type, write, path } => {
            let repo = if write {
                Some(Repository::find(&cwd)?)
            } else {
                None
            };
            let sha = ves::hash_object::hash_object(repo.as_ref(), &path, r#type.as_bytes())?;
            println!("{sha}");
        }

        Commands::CatFile { r#type, object } => {
            let repo = Repository::find(&cwd)?;
            ves::cat_file::cat_file(&repo, &object, Some(r#type.as_bytes()), &mut stdout)?;
        }

        Commands::LsTree { recursive, tree } => {
            let repo = Repository::find(&cwd)?;
            ves::ls_tree::ls_tree(&repo, &tree, recursive, &mut stdout)?;
        }

        Commands::LsFiles { verbose } => {
            let repo = Repository::find(&cwd)?;
            ves::ls_files::ls_files(&repo, verbose, &mut stdout)?;
        }

        Commands::RevParse { ves_type, name } => {
            let repo = Repository::find(&cwd)?;
            let fmt = ves_type.as_ref().map(|t| t.as_bytes());
            if let Some(sha) = object_find(&repo, &name, fmt, true)? {
                println!("{sha}");
            }
        }

        Commands::ShowRef => {
            let repo = Repository::find(&cwd)?;
            let refs = ves::refs::ref_list(&repo)?;
            ves::refs::show_refs(&refs, true, "refs", &mut stdout)?;
        }

        Commands::Log { commit } => {
            let repo = Repository::find(&cwd)?;
            ves::log::log(&repo, &commit, &mut stdout)?;
        }

        Commands::Checkout { commit, path } => {
            let repo = Repository::find(&cwd)?;
            ves::checkout::checkout(&repo, &commit, &path)?;
        }

        Commands::Add { paths } => {
            let repo = Repository::find(&cwd)?;
            ves::add::add(&repo, &paths)?;
        }

        Commands::Rm { paths } => {
            let repo = Repository::find(&cwd)?;
            ves::remove::rm(&repo, &paths, true, false)?;
        }

        Commands::Status => {
            let repo = Repository::find(&cwd)?;
            ves::status::status(&repo, &mut stdout)?;
        }

        Commands::Commit { message } => {
            let repo = Repository::find(&cwd)?;
            let sha = ves::commit::commit(&repo, &message)?;
            println!("{sha}");
        }

        Commands::Tag { annotate, name, object } => {
            let repo = Repository::find(&cwd)?;
            ves::tag::tag(&repo, name.as_deref(), &object, annotate, &mut stdout)?;
        }

        Commands::CheckIgnore { paths } => {
            let repo = Repository::find(&cwd)?;
            let rules = ves::ignore::ignore_read(&repo)?;
            for path in &paths {
                if ves::ignore::check_ignore(&rules, path)? {
                    writeln!(stdout, "{path}")?;
                }
            }
        }
    }

    Ok(())
}
