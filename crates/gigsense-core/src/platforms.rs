//! Platform classification and static lookup tables
//!
//! Maps free-text bank descriptors to canonical gig-platform labels, and
//! carries the related fixed tables: pairing suggestions for single-platform
//! workers and per-city market benchmarks. Everything here is immutable
//! config data; the functions are pure lookups.

/// Sentinel label for descriptors no table entry matches
pub const OTHER_PLATFORM: &str = "Other";

/// Ordered keyword table. The first entry whose keyword set has any member
/// contained in the upper-cased descriptor wins, so more specific brands
/// ("UBER EATS") must come before their prefixes ("UBER").
pub static PLATFORM_KEYWORDS: &[(&[&str], &str)] = &[
    (&["UBER EATS", "UBEREATS"], "Uber Eats"),
    (&["UBER"], "Uber"),
    (&["LYFT"], "Lyft"),
    (&["DOORDASH", "DASHER"], "DoorDash"),
    (&["GRUBHUB"], "Grubhub"),
    (&["POSTMATES"], "Postmates"),
    (&["INSTACART"], "Instacart"),
    (&["SHIPT"], "Shipt"),
    (&["AMAZON FLEX", "AMZN FLEX"], "Amazon Flex"),
    (&["TASKRABBIT", "TASK RABBIT"], "TaskRabbit"),
    (&["HANDY.COM", "HANDY TECHNOLOGIES"], "Handy"),
    (&["ROVER.COM", "ROVER "], "Rover"),
    (&["WAG LABS", "WAG!"], "Wag"),
    (&["UPWORK"], "Upwork"),
    (&["FIVERR"], "Fiverr"),
    (&["FREELANCER.COM"], "Freelancer"),
    (&["ETSY"], "Etsy"),
    (&["AIRBNB"], "Airbnb"),
    (&["TURO"], "Turo"),
    (&["GETAROUND"], "Getaround"),
];

/// Classify a transaction descriptor into a platform label.
///
/// Case-insensitive substring match against [`PLATFORM_KEYWORDS`] in table
/// order; unmatched descriptors return [`OTHER_PLATFORM`]. Total and
/// deterministic: this never fails.
pub fn classify(description: &str) -> &'static str {
    let desc = description.to_uppercase();
    for (keywords, label) in PLATFORM_KEYWORDS {
        if keywords.iter().any(|k| desc.contains(k)) {
            return label;
        }
    }
    OTHER_PLATFORM
}

/// Suggested second platforms for workers currently on a single one
static PLATFORM_PAIRINGS: &[(&str, &[&str])] = &[
    ("Uber", &["DoorDash", "Instacart"]),
    ("Lyft", &["DoorDash", "Uber Eats"]),
    ("Uber Eats", &["Lyft", "Shipt"]),
    ("DoorDash", &["Uber", "Instacart"]),
    ("Grubhub", &["DoorDash", "Uber"]),
    ("Instacart", &["Shipt", "DoorDash"]),
    ("Upwork", &["Fiverr", "Freelancer"]),
    ("Fiverr", &["Upwork", "TaskRabbit"]),
    ("Rover", &["Wag", "TaskRabbit"]),
];

/// Default pairing for platforms without a table entry
pub const DEFAULT_PAIRING: &[&str] = &["DoorDash", "Uber"];

/// Look up the suggested complements for a platform, falling back to
/// [`DEFAULT_PAIRING`] for unmapped ones.
pub fn pairing_for(platform: &str) -> &'static [&'static str] {
    PLATFORM_PAIRINGS
        .iter()
        .find(|(name, _)| *name == platform)
        .map(|(_, pair)| *pair)
        .unwrap_or(DEFAULT_PAIRING)
}

/// Local market data for rideshare-heavy cities
#[derive(Debug, Clone, Copy)]
pub struct CityBenchmark {
    pub city: &'static str,
    /// Typical gross hourly for rideshare drivers in this market
    pub avg_hourly: f64,
    pub hotspots: &'static str,
    /// Pool the random city tip is drawn from
    pub tips: &'static [&'static str],
}

pub static CITY_BENCHMARKS: &[CityBenchmark] = &[
    CityBenchmark {
        city: "Austin",
        avg_hourly: 24.50,
        hotspots: "Downtown 6th Street, The Domain, airport runs on Sunday evenings",
        tips: &[
            "SXSW and ACL weeks can double your takings; plan your schedule around festival season.",
            "UT game days flood the Drag with ride requests an hour before kickoff.",
            "Rainey Street bar close (1:45-2:30am) is the most reliable surge window.",
        ],
    },
    CityBenchmark {
        city: "New York",
        avg_hourly: 31.00,
        hotspots: "Midtown Manhattan, LaGuardia queue, Williamsburg on weekends",
        tips: &[
            "TLC minimum pay rules mean longer trips out of Manhattan usually beat short hops.",
            "Broadway theaters let out between 9:45 and 10:15pm; stage near Times Square.",
            "JFK holding lot moves fastest on weekday mornings before 7am.",
        ],
    },
    CityBenchmark {
        city: "Los Angeles",
        avg_hourly: 26.75,
        hotspots: "LAX, Santa Monica, West Hollywood after 10pm",
        tips: &[
            "Avoid the 405 at rush hour; short Westside loops pay better than crosstown hauls.",
            "Dodger games end around 10pm and empty out all at once; stage on Sunset.",
            "Early-morning LAX drops chain well into Venice breakfast delivery runs.",
        ],
    },
    CityBenchmark {
        city: "Chicago",
        avg_hourly: 25.25,
        hotspots: "The Loop, Wrigleyville on game nights, O'Hare early mornings",
        tips: &[
            "Cubs night games turn Wrigleyville into a surge zone from the 7th inning on.",
            "Winter weather premiums are real; drivers who brave snow days earn 20-30% more.",
            "The United Center clears 20,000 people in half an hour after Bulls games.",
        ],
    },
    CityBenchmark {
        city: "San Francisco",
        avg_hourly: 29.50,
        hotspots: "SoMa, Financial District weekday lunches, Marina weekends",
        tips: &[
            "Tech shuttle gaps (before 8am, after 7pm) are when downtown demand spikes.",
            "Oracle Park lets out down a single street; stage on King, not Third.",
            "Fog delays at SFO push riders to last-minute rides; watch the arrivals board.",
        ],
    },
    CityBenchmark {
        city: "Miami",
        avg_hourly: 23.75,
        hotspots: "South Beach, Brickell, Wynwood on Friday nights",
        tips: &[
            "Cruise ship turnaround mornings at PortMiami are a guaranteed queue of fares.",
            "Art Basel week is the single best earnings week of the year.",
            "Beach demand collapses in afternoon rain; pivot to food delivery until it passes.",
        ],
    },
    CityBenchmark {
        city: "Seattle",
        avg_hourly: 27.00,
        hotspots: "South Lake Union, Capitol Hill nights, SeaTac queue",
        tips: &[
            "Seattle's engaged-time pay standard means keeping acceptance high pays off here.",
            "Stadium events at Lumen Field stack with Pioneer Square bar traffic.",
            "Eastside tech campuses generate steady morning demand toward Bellevue.",
        ],
    },
    CityBenchmark {
        city: "Denver",
        avg_hourly: 24.00,
        hotspots: "LoDo, RiNo breweries, DIA runs year-round",
        tips: &[
            "Ski season Friday evenings fill I-70 with airport pickups heading to the mountains.",
            "Red Rocks shows end late with no transit; the venue lot is worth the drive.",
            "Snow days slow traffic but horizontal demand doubles; chains pay for themselves.",
        ],
    },
];

/// Case-insensitive benchmark lookup
pub fn city_benchmark(city: &str) -> Option<&'static CityBenchmark> {
    CITY_BENCHMARKS
        .iter()
        .find(|b| b.city.eq_ignore_ascii_case(city.trim()))
}
