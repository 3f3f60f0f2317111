use std::time::Duration;

use cgv_ai::batch::SessionMode;
use cgv_core::domain::NoInformationPolicy;

/// A named, ready-to-run query set with the session and pacing it was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub queries: &'static [&'static str],
    /// `None` falls back to the time-stamped default prefix.
    pub session_id_prefix: Option<&'static str>,
    pub session_mode: SessionMode,
    pub inter_query_delay: Duration,
    pub timeout: Duration,
    pub no_information_policy: NoInformationPolicy,
}

const UAT_QUERIES: &[&str] = &[
    "როგორ განისაზღვრება ფიზიკური პირის რეზიდენტობა საქართველოში და როგორია მასზე საგადასახადო ვალდებულებები?",
    "რა პირობით გათავისუფლდება მაღალი მთის სტატუსის მქონე პირი საშემოსავლო გადასახადისგან?",
    "რა წესით განისაზღვრება მოგების გადასახადის ობიექტი იურიდიული პირებისთვის?",
    "როგორია დამატებული ღირებულების გადასახადის (დღგ) გადახდის ვალდებულების წარმოშობის მომენტი?",
    "რა შემთხვევაში არის შესაძლებელი გადასახადის ხანდაზმულობის ვადის გაგრძელება?",
    "როგორია ქონების გადასახადის გადახდის ვალდებულება და ვალდებული სუბიექტები?",
    "როგორია საშემოსავლოს გადასახადის გადახდის ვალდებულება და რამდენი პროცენტით განისაზღვრება?",
    "რა შემთხვევაში ითვლება ვალი უიმედო ვალად და როგორ განთავისუფლდება გადამხდელი დღგ-სგან?",
    "როგორია საგადასახადო შეთანხმების სამართლებრივი შედეგები?",
    "რა პირობებით შესაძლებელია რეზიდენტი კომპანიის მიერ არარეზიდენტისთვის დივიდენდის, როიალტის ან პროცენტის გადახდა დაბეგრილი შემცირებული განაკვეთით?",
];

// Queries that previously cited articles the retriever never returned (166 and 81).
const HALLUCINATION_QUERIES: &[&str] = &[
    "რა განაკვეთით იბეგრება საშემოსავლო გადასახადი?",
    "როგორია დღგ-ის გადახდის ვალდებულების წარმოშობის მომენტი?",
    "როგორია საშემოსავლოს გადასახადის გადახდის ვალდებულება?",
];

const IMPROVEMENT_QUERIES: &[&str] = &[
    "რა განაკვეთით იბეგრება საშემოსავლო გადასახადი?",
    "როგორია დღგ-ის განაკვეთი?",
    "როგორია ქონების გადასახადის გადახდის ვალდებულება?",
];

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "uat",
        description: "Ten-question acceptance run over one shared session",
        queries: UAT_QUERIES,
        session_id_prefix: None,
        session_mode: SessionMode::Shared,
        inter_query_delay: Duration::from_secs(1),
        timeout: Duration::from_secs(60),
        no_information_policy: NoInformationPolicy::Ignore,
    },
    Preset {
        name: "hallucination",
        description: "Regression set for citations outside the retrieved articles",
        queries: HALLUCINATION_QUERIES,
        session_id_prefix: Some("hallucination_test"),
        session_mode: SessionMode::PerQuery,
        inter_query_delay: Duration::ZERO,
        timeout: Duration::from_secs(30),
        no_information_policy: NoInformationPolicy::Ignore,
    },
    Preset {
        name: "improvements",
        description: "Queries that used to return no information",
        queries: IMPROVEMENT_QUERIES,
        session_id_prefix: Some("test_improvements"),
        session_mode: SessionMode::PerQuery,
        inter_query_delay: Duration::ZERO,
        timeout: Duration::from_secs(30),
        // These queries used to come back as "სამწუხაროდ ... არ არის".
        no_information_policy: NoInformationPolicy::Warn,
    },
];

pub fn find_preset(name: &str) -> Option<&'static Preset> {
    let name = name.trim();
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}
