//! robots.txt handling for the crawl guard.
//!
//! Allow/deny decisions are delegated to `robotstxt`'s matcher. Only the
//! `Crawl-delay` of the group that applies to our agent is read here.

use std::time::Duration;

/// Longest crawl delay honoured; larger values are clamped.
const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RobotsRules {
    body: String,
    agent: String,
    crawl_delay: Option<Duration>,
}

impl RobotsRules {
    /// Rules that permit everything; used when robots.txt is absent or unreadable.
    pub(crate) fn allow_all() -> Self {
        Self::default()
    }

    /// Keeps `content` for matching against `user_agent`'s product token
    /// (`storeprobe/0.1 (+info)` matches groups named `storeprobe`).
    pub(crate) fn parse(content: &str, user_agent: &str) -> Self {
        let agent = user_agent
            .split(['/', ' '])
            .next()
            .unwrap_or(user_agent)
            .trim()
            .to_string();
        let crawl_delay = crawl_delay_for(content, &agent.to_ascii_lowercase());
        Self {
            body: content.to_string(),
            agent,
            crawl_delay,
        }
    }

    /// Whether `url` (absolute) may be fetched.
    pub(crate) fn is_allowed(&self, url: &str) -> bool {
        if self.body.trim().is_empty() {
            return true;
        }
        let mut matcher = robotstxt::DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.body, &self.agent, url)
    }

    pub(crate) fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay
    }
}

/// `Crawl-delay` of the group naming `agent`, else of the `*` group.
/// Consecutive `User-agent` lines share one group.
fn crawl_delay_for(content: &str, agent: &str) -> Option<Duration> {
    let mut specific = None;
    let mut wildcard = None;
    let mut group_agents: Vec<String> = Vec::new();
    let mut collecting_agents = false;

    for raw_line in content.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        let Some((directive, value)) = line.split_once(':') else {
            continue;
        };
        let directive = directive.trim().to_ascii_lowercase();
        let value = value.trim();

        if directive == "user-agent" {
            if !collecting_agents {
                group_agents.clear();
            }
            collecting_agents = true;
            group_agents.push(value.to_ascii_lowercase());
            continue;
        }
        collecting_agents = false;

        if directive != "crawl-delay" {
            continue;
        }
        let delay = parse_delay(value);
        if group_agents.iter().any(|a| a == agent) {
            specific = specific.or(delay);
        } else if group_agents.iter().any(|a| a == "*") {
            wildcard = wildcard.or(delay);
        }
    }
    specific.or(wildcard)
}

/// Seconds as written in robots.txt, clamped to [`MAX_CRAWL_DELAY`].
fn parse_delay(value: &str) -> Option<Duration> {
    let secs = value.parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs.min(MAX_CRAWL_DELAY.as_secs_f64())).ok()
}
