//! Built-in site policies.

use super::{pattern, ContentPolicy};

/// Every built-in policy, grouped by site family.
pub(super) fn builtin_policies() -> Vec<ContentPolicy> {
    let mut policies = Vec::new();
    policies.extend(news());
    policies.extend(finance());
    policies.extend(social());
    policies.extend(tech());
    policies
}

fn news() -> Vec<ContentPolicy> {
    vec![
        ContentPolicy::new("bbc")
            .with_domains(&["bbc.com", "bbc.co.uk"])
            .with_scroll()
            .with_extra_wait(1.0)
            .with_removal(pattern(r"Advertisement\s*\n"))
            .with_removal(pattern(
                r"(?m)^[ \t]*\[(?:Home|News|Sport|Business|Technology|Health|Culture|Arts|Travel|Earth|Audio|Video|Live|Weather|Newsletters)\]\([^)]+\)[ \t]*\n?",
            )),
        ContentPolicy::new("cnbc")
            .with_domains(&["cnbc.com"])
            .with_scroll()
            .with_extra_wait(1.0)
            .with_removal(pattern(r"\[Skip Navigation\][^\n]*\n?")),
        ContentPolicy::new("reuters")
            .with_domains(&["reuters.com"])
            .with_scroll()
            .with_extra_wait(2.0)
            .with_cleanup(),
        ContentPolicy::new("jin10")
            .with_domains(&["jin10.com"])
            .with_scroll()
            .with_extra_wait(3.0)
            .with_removal(pattern(r"(?:下载APP|扫码下载|开通VIP|免费试用)[^\n]*\n?")),
    ]
}

fn finance() -> Vec<ContentPolicy> {
    vec![
        ContentPolicy::new("investing")
            .with_domains(&["investing.com"])
            .with_scroll()
            .with_extra_wait(2.0)
            .with_removal(pattern(r"(?:Download the App|Install|Sign In|Join for free)[^\n]*\n?"))
            .with_removal(pattern(r"(?:Advertisement|Advertise)[^\n]*\n?")),
        ContentPolicy::new("yahoo_finance")
            .with_domains(&["finance.yahoo.com"])
            .with_scroll()
            .with_extra_wait(2.0)
            .with_removal(pattern(r"(?:Sign in|Try the app|Get the app|Yahoo Finance Plus)[^\n]*\n?")),
        ContentPolicy::new("myfxbook")
            .with_domains(&["myfxbook.com"])
            .with_scroll()
            .with_extra_wait(1.0)
            .with_removal(pattern(r"(?:Join|Login|Register|Sign Up|Free Sign Up)[^\n]*\n?")),
        ContentPolicy::new("bloomberg")
            .with_domains(&["bloomberg.com"])
            .with_scroll()
            .with_extra_wait(3.0)
            .with_removal(pattern(r"(?:Subscribe|Sign In|Already a subscriber)[^\n]*\n?"))
            .with_low_yield(500, "Bloomberg paywall: only the summary was captured"),
        ContentPolicy::new("wsj")
            .with_domains(&["wsj.com"])
            .with_scroll()
            .with_extra_wait(2.0)
            .with_removal(pattern(r"(?:Subscribe|Sign In|Already a member)[^\n]*\n?"))
            .with_low_yield(200, "WSJ paywall: article body is restricted"),
        ContentPolicy::new("ft")
            .with_domains(&["ft.com"])
            .with_scroll()
            .with_extra_wait(2.0)
            .with_removal(pattern(r"(?:Subscribe|Sign In|Already a subscriber|Try for \$1)[^\n]*\n?")),
    ]
}

fn social() -> Vec<ContentPolicy> {
    vec![
        ContentPolicy::new("reddit")
            .with_domains(&["reddit.com", "old.reddit.com"])
            .with_scroll()
            .with_extra_wait(2.0)
            .with_removal(pattern(r"(?:Get the Reddit app|Log In|Sign Up|Get app)[^\n]*\n?"))
            .with_removal(pattern(r"(?:Share|Save|Hide|Report|More)\s*\n")),
        ContentPolicy::new("trends24")
            .with_domains(&["trends24.in"])
            .with_extra_wait(1.0)
            .with_removal(pattern(r"# .* Trends for last.*\n+"))
            .with_removal(pattern(r"### \d+ .* ago\n+")),
        ContentPolicy::new("twitter")
            .with_domains(&["x.com", "twitter.com"])
            .requires_login()
            .with_scroll()
            .with_extra_wait(3.0)
            .with_low_yield(
                100,
                "X/Twitter serves little without a logged-in session; use the API or a web search for site:x.com",
            ),
        ContentPolicy::new("medium")
            .with_domains(&["medium.com"])
            .with_scroll()
            .with_removal(pattern(r"(?:Open in app|Sign up|Sign in|Member-only story|Get started)[^\n]*\n?"))
            .with_removal(pattern(r"(?:Follow|Clap|Share|Listen)[^\n]*\n?")),
        ContentPolicy::new("youtube")
            .with_domains(&["youtube.com", "youtu.be"])
            .with_scroll()
            .with_extra_wait(3.0)
            .with_low_yield(200, "YouTube pages render little text; use yt-dlp or the YouTube Data API"),
    ]
}

fn tech() -> Vec<ContentPolicy> {
    vec![
        ContentPolicy::new("techcrunch")
            .with_domains(&["techcrunch.com"])
            .with_scroll()
            .with_removal(pattern(r"(?:Log in|Sign up|Newsletter|Subscribe)[^\n]*\n?"))
            .with_removal(pattern(r"(?:© 20\d\d TechCrunch)[^\n]*\n?"))
            .syncing_bodies(),
        ContentPolicy::new("theverge")
            .with_domains(&["theverge.com"])
            .with_scroll()
            .with_removal(pattern(r"(?:The Verge homepage|Site search|Filed under)[^\n]*\n?"))
            .syncing_bodies(),
        ContentPolicy::new("wikipedia")
            .with_domains(&["wikipedia.org"])
            .with_removal(pattern(r"\[edit\]"))
            .with_removal(pattern(r"\[\d+\]"))
            .with_removal(pattern(r"(?:From Wikipedia|Jump to navigation|Jump to search)[^\n]*\n?"))
            .syncing_bodies(),
        ContentPolicy::new("hackernews")
            .with_domains(&["news.ycombinator.com"])
            .with_removal(pattern(r"\| *\| *\| *\| *\|"))
            .with_removal(pattern(r"\| *-+ *\| *-+ *\| *-+ *\| *-+ *\|"))
            .syncing_bodies()
            .with_low_yield(
                200,
                "Hacker News table layout converts poorly; use the official API at https://hacker-news.firebaseio.com/v0/",
            ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FetchResult, FetchStatus};
    use crate::policy::{PolicyRegistry, HINT_KEY};

    fn refine(domain: &str, body: &str) -> FetchResult {
        let registry = PolicyRegistry::builtin();
        let result = FetchResult::new(format!("https://{domain}/x"), "render").with_raw_body(body);
        registry.lookup(domain).refine(result)
    }

    #[test]
    fn test_catalog_compiles_and_registers_all_domains() {
        let registry = PolicyRegistry::builtin();
        for domain in [
            "bbc.com", "bbc.co.uk", "cnbc.com", "reuters.com", "jin10.com", "investing.com",
            "finance.yahoo.com", "myfxbook.com", "bloomberg.com", "wsj.com", "ft.com",
            "reddit.com", "old.reddit.com", "trends24.in", "x.com", "twitter.com", "medium.com",
            "youtube.com", "youtu.be", "techcrunch.com", "theverge.com", "wikipedia.org",
            "news.ycombinator.com",
        ] {
            assert_ne!(registry.lookup(domain).name, "default", "{domain}");
        }
    }

    #[test]
    fn test_policy_names_are_unique() {
        let policies = builtin_policies();
        let mut names: Vec<_> = policies.iter().map(|p| p.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), policies.len());
    }

    #[test]
    fn test_bbc_strips_ads_and_nav() {
        let out = refine(
            "bbc.com",
            "Headline\n[Home](https://bbc.com)\n[Sport](https://bbc.com/sport)\nAdvertisement\nStory text",
        );
        assert_eq!(out.raw_body, "Headline\nStory text");
    }

    #[test]
    fn test_wikipedia_strips_edit_and_citations() {
        let out = refine(
            "en.wikipedia.org",
            "From Wikipedia, the free encyclopedia\nRust[1] is a language.[edit]\n\n\n\nMore[23].",
        );
        assert_eq!(out.raw_body, "Rust is a language.\n\nMore.");
        assert_eq!(out.reduced_body, out.raw_body);
    }

    #[test]
    fn test_jin10_strips_promotions() {
        let out = refine("jin10.com", "快讯\n下载APP 查看更多\n开通VIP享受\n正文");
        assert_eq!(out.raw_body, "快讯\n正文");
    }

    #[test]
    fn test_hackernews_strips_table_artifacts_and_flags_low_yield() {
        let out = refine(
            "news.ycombinator.com",
            "| | | | |\n| --- | --- | --- | --- |\n1. Show HN: a thing\n\n\n\n",
        );
        assert_eq!(out.raw_body, "1. Show HN: a thing");
        assert_eq!(out.status, FetchStatus::Partial);
        let hint = out.metadata.get(HINT_KEY).and_then(|v| v.as_str()).unwrap();
        assert!(hint.contains("hacker-news.firebaseio.com"));
    }

    #[test]
    fn test_twitter_requires_login() {
        let registry = PolicyRegistry::builtin();
        assert!(registry.lookup("x.com").needs_login);
        let out = refine("x.com", "Log in to X");
        assert_eq!(out.status, FetchStatus::Partial);
    }

    #[test]
    fn test_long_bloomberg_article_stays_success() {
        let body = format!("Subscribe now\n{}", "Markets rallied. ".repeat(40));
        let out = refine("bloomberg.com", &body);
        assert_eq!(out.status, FetchStatus::Success);
        assert!(!out.raw_body.contains("Subscribe"));
    }
}
