use std::env;
use std::path::PathBuf;

/// Candidate `.env` files in lookup order: an explicit
/// `BURST_UPGRADE_ENV_FILE`, then the working directory, then
/// `<BURST_UPGRADE_HOME or ~>/burst-upgrade/.env`.
fn dotenv_candidates(
    explicit: Option<PathBuf>,
    cwd: Option<PathBuf>,
    upgrade_home: Option<PathBuf>,
    home_dir: Option<PathBuf>,
) -> Vec<PathBuf> {
    let mut out = Vec::with_capacity(3);
    out.extend(explicit);
    out.extend(cwd.map(|dir| dir.join(".env")));
    out.extend(upgrade_home.or(home_dir).map(|base| base.join("burst-upgrade/.env")));
    out
}

/// Loads the first existing candidate. Variables already set in the
/// process environment are never overridden.
pub fn load_dotenv() -> Option<PathBuf> {
    let candidates = dotenv_candidates(
        env::var_os("BURST_UPGRADE_ENV_FILE").map(PathBuf::from),
        env::current_dir().ok(),
        env::var_os("BURST_UPGRADE_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );
    let path = candidates.into_iter().find(|path| path.is_file())?;
    dotenvy::from_path(&path).ok()?;
    Some(path)
}
