//! Fingerprint command implementation.

use sovereign_core::ContextFingerprint;

pub fn run(
    query: String,
    user: Option<String>,
    jurisdiction: String,
    timestamp: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let digest = ContextFingerprint::default().generate_fingerprint(
        &query,
        user.as_deref(),
        &jurisdiction,
        timestamp.as_deref(),
    )?;
    println!("{}", digest);
    Ok(())
}
