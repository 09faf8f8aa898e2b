use chrono::{DateTime, Local};

fn build_datetime() -> DateTime<Local> {
    let build_timestamp: i64 = env!("BUILD_TIME").parse().unwrap_or(0);
    DateTime::from_timestamp(build_timestamp, 0)
        .map(|utc| utc.with_timezone(&Local))
        .unwrap_or_else(Local::now)
}

pub fn get_version_info() -> &'static str {
    let version = env!("CARGO_PKG_VERSION");
    let git_commit = env!("GIT_COMMIT_HASH");
    let git_branch = env!("GIT_BRANCH");
    let git_dirty = env!("GIT_DIRTY");
    let build_time_str = build_datetime().format("%Y-%m-%d %H:%M:%S %Z").to_string();

    Box::leak(
        format!(
            "rtcsignal {}\n\
         Build Time: {}\n\
         Git Commit: {}\n\
         Git Branch: {}\n\
         Git Status: {}",
            version, build_time_str, git_commit, git_branch, git_dirty
        )
        .into_boxed_str(),
    )
}

pub fn get_short_version() -> &'static str {
    let version = env!("CARGO_PKG_VERSION");
    let git_commit = env!("GIT_COMMIT_HASH");
    if env!("GIT_DIRTY") == "dirty" {
        Box::leak(format!("{}-{}-dirty", version, git_commit).into_boxed_str())
    } else {
        Box::leak(format!("{}-{}", version, git_commit).into_boxed_str())
    }
}

/// The `user_agent` announced to the signaling server.
pub fn get_useragent() -> String {
    format!(
        "rtcsignal/{} (built {})",
        env!("CARGO_PKG_VERSION"),
        build_datetime().format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_useragent() {
        let ua = get_useragent();
        assert!(ua.starts_with(&format!("rtcsignal/{}", env!("CARGO_PKG_VERSION"))));
        assert!(get_version_info().contains("Git Commit"));
        assert!(get_short_version().starts_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_build_stamps() {
        assert!(env!("BUILD_TIME").parse::<u64>().is_ok());
        assert!(!env!("GIT_COMMIT_HASH").is_empty());
        assert!(!env!("GIT_BRANCH").is_empty());
        assert!(["clean", "dirty", "unknown"].contains(&env!("GIT_DIRTY")));
    }
}
