use argh::FromArgs;
use pipesh::builtin::change_dir;
use std::env;

#[derive(FromArgs)]
/// Change into a directory and print the resulting working directory.
struct Args {
    #[argh(positional)]
    /// directory to switch to.
    path: String,
}

fn main() -> anyhow::Result<()> {
    // A wrong argument count exits with status 1 here.
    let args: Args = argh::from_env();

    if let Err(e) = change_dir(&args.path) {
        eprintln!("{}", e);
    }

    let cwd = env::current_dir()?;
    println!("Current Working Directory: {}", cwd.display());
    Ok(())
}
