//! Topical content categories.
//!
//! Each category owns its own content table and its own feed list. The nine
//! builtin categories carry hardcoded feed URLs; the two medical categories
//! are registry-backed and read their feed list from the `feed_sources`
//! table, filtered by the active flag.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

/// A closed enumeration of content categories.
///
/// Category tags double as content table suffixes, so adding a variant here
/// is the only step needed to provision a new category — the schema migration
/// iterates [`Category::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Category {
    General,
    Python,
    Cybersecurity,
    #[value(name = "software_dev")]
    SoftwareDev,
    #[value(name = "ui_ux")]
    UiUx,
    #[value(name = "mobile_pc")]
    MobilePc,
    Jobs,
    Crypto,
    Ai,
    #[value(name = "medical_news")]
    MedicalNews,
    #[value(name = "ai_medical_imaging")]
    AiMedicalImaging,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::General,
        Category::Python,
        Category::Cybersecurity,
        Category::SoftwareDev,
        Category::UiUx,
        Category::MobilePc,
        Category::Jobs,
        Category::Crypto,
        Category::Ai,
        Category::MedicalNews,
        Category::AiMedicalImaging,
    ];

    /// Stable tag used in table names and the `feed_sources.category` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Python => "python",
            Category::Cybersecurity => "cybersecurity",
            Category::SoftwareDev => "software_dev",
            Category::UiUx => "ui_ux",
            Category::MobilePc => "mobile_pc",
            Category::Jobs => "jobs",
            Category::Crypto => "crypto",
            Category::Ai => "ai",
            Category::MedicalNews => "medical_news",
            Category::AiMedicalImaging => "ai_medical_imaging",
        }
    }

    /// Human-readable label for CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Category::General => "General Tech",
            Category::Python => "Python",
            Category::Cybersecurity => "Cyber Security",
            Category::SoftwareDev => "Software Development",
            Category::UiUx => "UI/UX",
            Category::MobilePc => "Mobile & PC",
            Category::Jobs => "Job Updates",
            Category::Crypto => "Crypto",
            Category::Ai => "Artificial Intelligence",
            Category::MedicalNews => "Medical News",
            Category::AiMedicalImaging => "AI in Medical Imaging",
        }
    }

    /// SQLite table holding this category's content rows.
    pub fn table(&self) -> String {
        format!("content_{}", self.as_str())
    }

    /// Registry-backed categories read their feed list from the database
    /// instead of the builtin lists.
    pub fn is_registry_backed(&self) -> bool {
        matches!(self, Category::MedicalNews | Category::AiMedicalImaging)
    }

    /// Builtin feed URLs for non-registry categories. Empty for
    /// registry-backed categories.
    pub fn builtin_feeds(&self) -> &'static [&'static str] {
        match self {
            Category::General => &[
                "https://techcrunch.com/feed/",
                "https://arstechnica.com/feed/",
                "https://www.wired.com/feed/rss/",
                "https://www.theverge.com/rss/index.xml",
                "https://thenextweb.com/feed/",
                "https://www.engadget.com/rss.xml",
                "https://gizmodo.com/rss",
                "https://www.techmeme.com/feed.xml",
                "https://mashable.com/feeds/rss/all",
            ],
            Category::Python => &[
                "https://realpython.com/atom.xml?format=xml",
                "https://planetpython.org/rss20.xml",
                "https://blog.python.org/feeds/posts/default",
                "https://talkpython.fm/episodes/rss",
                "https://blog.jetbrains.com/pycharm/feed/",
                "https://devblogs.microsoft.com/python/feed/",
                "https://www.fullstackpython.com/feeds/all.atom.xml",
                "https://pythonbytes.fm/episodes/rss",
                "https://blog.miguelgrinberg.com/feed",
            ],
            Category::Cybersecurity => &[
                "https://feeds.feedburner.com/TheHackersNews",
                "https://www.darkreading.com/rss_simple.asp",
                "https://krebsonsecurity.com/feed/",
                "https://www.cyberscoop.com/feed/",
                "https://www.helpnetsecurity.com/feed/",
                "https://securityaffairs.co/feed",
                "https://securelist.com/feed/",
                "https://securityintelligence.com/feed/",
                "https://www.bleepingcomputer.com/feed/",
                "https://portswigger.net/daily-swig/rss",
                "https://www.recordedfuture.com/feed",
            ],
            Category::SoftwareDev => &[
                "https://news.ycombinator.com/rss",
                "https://feed.infoq.com/",
                "https://martinfowler.com/feed.atom",
                "https://sdtimes.com/feed/",
                "https://www.developer-tech.com/feed",
                "https://blog.codinghorror.com/rss/",
                "https://www.joelonsoftware.com/feed/",
                "https://dev.to/feed",
                "https://github.blog/feed/",
                "https://engineering.fb.com/feed/",
                "https://netflixtechblog.com/feed",
            ],
            Category::UiUx => &[
                "https://uxdesign.cc/feed",
                "https://uxplanet.org/feed",
                "https://www.smashingmagazine.com/feed/",
                "https://www.nngroup.com/feed/rss/",
                "https://usabilitygeek.com/feed/",
                "https://uxmastery.com/feed/",
                "https://www.invisionapp.com/inside-design/feed",
                "https://www.figma.com/blog/rss.xml",
                "https://alistapart.com/main/feed/",
                "https://css-tricks.com/feed/",
            ],
            Category::MobilePc => &[
                "https://www.androidcentral.com/feed",
                "https://9to5mac.com/feed/",
                "https://9to5google.com/feed/",
                "https://www.androidpolice.com/feed/",
                "https://www.xda-developers.com/feed/",
                "https://www.macrumors.com/macrumors.xml",
                "https://www.theverge.com/mobile/rss/index.xml",
                "https://www.pcworld.com/feed",
                "https://www.tomshardware.com/feeds/all",
            ],
            Category::Jobs => &[
                "https://weworkremotely.com/categories/remote-back-end-programming-jobs.rss",
                "https://weworkremotely.com/categories/remote-full-stack-programming-jobs.rss",
                "https://weworkremotely.com/remote-jobs.rss",
                "https://techcrunch.com/category/startups/feed/",
                "https://news.crunchbase.com/feed/",
                "https://stackoverflow.blog/feed/",
                "https://www.jobbio.com/feed/",
                "https://blog.hired.com/feed/",
            ],
            Category::Crypto => &[
                "https://cointelegraph.com/rss",
                "https://bitcoinmagazine.com/.rss/full/",
                "https://cryptopotato.com/feed/",
                "https://crypto.news/feed/",
                "https://decrypt.co/feed",
                "https://www.coindesk.com/arc/outboundfeeds/rss/",
                "https://thedefiant.io/feed/",
                "https://blockworks.co/feed/",
            ],
            Category::Ai => &[
                "https://www.zdnet.com/topic/artificial-intelligence/rss.xml",
                "https://www.technologyreview.com/feed/",
                "https://syncedreview.com/category/ai/feed/",
                "https://www.kdnuggets.com/feed/rss2",
                "https://www.aitrends.com/feed/",
                "https://www.analyticsinsight.net/category/artificial-intelligence/feed/",
                "https://machinelearningmastery.com/feed/",
                "https://openai.com/blog/rss/",
                "https://blogs.nvidia.com/feed/",
                "https://ai.googleblog.com/feeds/posts/default",
                "https://aws.amazon.com/blogs/machine-learning/feed/",
                "https://www.marktechpost.com/feed/",
                "https://towardsdatascience.com/feed/",
            ],
            Category::MedicalNews | Category::AiMedicalImaging => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Unknown category tags are configuration errors and fatal to a run.
#[derive(Debug, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = "sports".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("sports"));
    }

    #[test]
    fn test_table_names_are_prefixed_tags() {
        assert_eq!(Category::General.table(), "content_general");
        assert_eq!(
            Category::AiMedicalImaging.table(),
            "content_ai_medical_imaging"
        );
    }

    #[test]
    fn test_registry_backed_categories_have_no_builtin_feeds() {
        for category in Category::ALL {
            if category.is_registry_backed() {
                assert!(category.builtin_feeds().is_empty());
            } else {
                assert!(!category.builtin_feeds().is_empty());
            }
        }
    }
}
