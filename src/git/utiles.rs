use anyhow::{Result, anyhow};

/// A remote split into the parts the forge APIs need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    pub scheme: String,
    pub host: String,
    /// `owner/repo` or `group/subgroup/project`, without `.git`.
    pub path: String,
}

impl RemoteUrl {
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').collect()
    }
}

/// Parses `https://host/owner/repo(.git)`, `ssh://user@host/owner/repo` and
/// scp-like `user@host:owner/repo.git` remotes. scp-like remotes map to `https`.
pub fn parse_remote(remote: &str) -> Result<RemoteUrl> {
    let s = remote.trim();
    if s.is_empty() {
        return Err(anyhow!("empty remote"));
    }

    if let Some(scheme_pos) = s.find("://") {
        let scheme = &s[..scheme_pos];
        let after_scheme = &s[scheme_pos + 3..];

        let slash_idx = after_scheme
            .find('/')
            .ok_or_else(|| anyhow!("No '/' found after scheme in remote URL"))?;

        let authority = &after_scheme[..slash_idx];
        let host = strip_port(strip_userinfo(authority));
        let mut path = &after_scheme[slash_idx..];

        if let Some(cut) = path.find(['?', '#']) {
            path = &path[..cut];
        }

        return Ok(RemoteUrl {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            path: normalize_git_path(path)?,
        });
    }

    if let Some(colon_idx) = s.find(':') {
        let host = strip_userinfo(&s[..colon_idx]);
        if host.is_empty() || host.contains('/') {
            return Err(anyhow!("Failed to extract repo remote path"));
        }
        return Ok(RemoteUrl {
            scheme: "https".to_string(),
            host: host.to_ascii_lowercase(),
            path: normalize_git_path(&s[colon_idx + 1..])?,
        });
    }

    Err(anyhow!("Failed to extract repo remote path"))
}

/// `owner/repo` part of a remote, used as a short label in reports.
pub fn extract_repo_path(remote: &str) -> Result<String> {
    parse_remote(remote).map(|r| r.path)
}

fn strip_userinfo(authority: &str) -> &str {
    authority.rsplit('@').next().unwrap_or(authority)
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((h, port)) if port.chars().all(|c| c.is_ascii_digit()) => h,
        _ => host,
    }
}

fn normalize_git_path(p: &str) -> Result<String> {
    let mut path = p.trim_matches('/').to_string();

    if let Some(cut) = path.find(['?', '#']) {
        path.truncate(cut);
    }
    if let Some(stripped) = path.strip_suffix(".git") {
        path = stripped.to_string();
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Err(anyhow!("Incorrect remote path: {}", path));
    }

    Ok(segments.join("/"))
}
