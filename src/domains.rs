use anyhow::{anyhow, Result};

/// Popular sites resolved in every round unless a domain file is given.
pub fn default_target_domains() -> Vec<String> {
	vec![
		"google.com",
		"youtube.com",
		"facebook.com",
		"wikipedia.org",
		"twitter.com",
		"reddit.com",
		"instagram.com",
		"yahoo.com",
		"amazon.com",
	].into_iter().map(String::from).collect()
}

/// Read domains from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_domain_file(path: &str) -> Result<Vec<String>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read domain file '{}': {}", path, e))?;
	parse_domains(&content)
}

fn parse_domains(content: &str) -> Result<Vec<String>> {
	let domains: Vec<String> = content.lines()
		.map(|line| line.trim().to_ascii_lowercase())
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.collect();
	if domains.is_empty() {
		return Err(anyhow!("domain list is empty"));
	}
	Ok(domains)
}
