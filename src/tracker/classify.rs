use crate::storage::entities::{Category, CategoryLists};

/// Maps a domain to its category. The productive list takes precedence if
/// a domain somehow ended up in both lists. An empty domain is neutral.
pub fn classify(domain: &str, lists: &CategoryLists) -> Category {
    if domain.is_empty() {
        return Category::Neutral;
    }
    if lists.productive.contains(domain) {
        Category::Productive
    } else if lists.unproductive.contains(domain) {
        Category::Unproductive
    } else {
        Category::Neutral
    }
}

/// The membership lists seeded on first run. Users adjust them afterwards
/// through the `updateCategories` control message.
pub fn default_lists() -> CategoryLists {
    let productive = [
        // Coding & development
        "github.com",
        "gitlab.com",
        "stackoverflow.com",
        "stackexchange.com",
        "codesandbox.io",
        "codepen.io",
        "replit.com",
        "w3schools.com",
        "developer.mozilla.org",
        "freecodecamp.org",
        "codecademy.com",
        "udemy.com",
        "coursera.org",
        "edx.org",
        "pluralsight.com",
        "leetcode.com",
        "hackerrank.com",
        "codeforces.com",
        // Documentation & tools
        "docs.google.com",
        "drive.google.com",
        "calendar.google.com",
        "notion.so",
        "miro.com",
        "figma.com",
        "asana.com",
        "trello.com",
        "jira.com",
        "slack.com",
        "teams.microsoft.com",
        "zoom.us",
        "meet.google.com",
        "evernote.com",
        "onenote.com",
        // Learning & productivity
        "medium.com",
        "dev.to",
        "hashnode.com",
        "todoist.com",
        "grammarly.com",
        "canva.com",
        "overleaf.com",
        "draw.io",
    ];

    let unproductive = [
        // Social media
        "facebook.com",
        "instagram.com",
        "twitter.com",
        "x.com",
        "tiktok.com",
        "snapchat.com",
        "pinterest.com",
        "reddit.com",
        "tumblr.com",
        "linkedin.com",
        "threads.net",
        // Video streaming
        "youtube.com",
        "netflix.com",
        "primevideo.com",
        "hulu.com",
        "disneyplus.com",
        "hotstar.com",
        "vimeo.com",
        "twitch.tv",
        "dailymotion.com",
        // Gaming
        "steam.com",
        "epicgames.com",
        "origin.com",
        "xbox.com",
        "playstation.com",
        "roblox.com",
        "minecraft.net",
        "chess.com",
        "lichess.org",
        // Entertainment & news
        "9gag.com",
        "buzzfeed.com",
        "imgur.com",
        "cnn.com",
        "bbc.com",
        "nytimes.com",
        "theguardian.com",
        "foxnews.com",
        "wsj.com",
        "espn.com",
        "sports.yahoo.com",
        // Shopping
        "amazon.com",
        "ebay.com",
        "walmart.com",
        "target.com",
        "aliexpress.com",
        "flipkart.com",
        "etsy.com",
        "bestbuy.com",
        "newegg.com",
    ];

    CategoryLists {
        productive: productive.into_iter().map(str::to_owned).collect(),
        unproductive: unproductive.into_iter().map(str::to_owned).collect(),
    }
}
