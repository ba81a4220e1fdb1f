use plaint_core::traits::ResourceDirectory;
use plaint_core::types::Resource;

/// (name, contact, website, description)
type Entry = (&'static str, &'static str, &'static str, &'static str);

const HOUSING: &[Entry] = &[(
    "Housing Development Board (HDB)",
    "1800-225-5432",
    "https://www.hdb.gov.sg",
    "Public housing issues, maintenance, policies",
)];

const TRANSPORT: &[Entry] = &[
    (
        "Land Transport Authority (LTA)",
        "1800-CALL-LTA (1800-2255-582)",
        "https://www.lta.gov.sg",
        "Road, public transport, traffic issues",
    ),
    (
        "PUB (Public Utilities Board)",
        "1800-CALL-PUB (1800-2255-782)",
        "https://www.pub.gov.sg",
        "Water supply, drainage, sewerage",
    ),
];

const HEALTHCARE: &[Entry] = &[(
    "Ministry of Health (MOH)",
    "6325-9220",
    "https://www.moh.gov.sg",
    "Healthcare policies, hospital services",
)];

const ENVIRONMENT: &[Entry] = &[(
    "National Environment Agency (NEA)",
    "1800-CALL-NEA (1800-2255-632)",
    "https://www.nea.gov.sg",
    "Environmental health, cleanliness, pest control",
)];

const EDUCATION: &[Entry] = &[(
    "Ministry of Education (MOE)",
    "6872-2220",
    "https://www.moe.gov.sg",
    "School policies, education matters",
)];

const EMPLOYMENT: &[Entry] = &[(
    "Ministry of Manpower (MOM)",
    "6438-5122",
    "https://www.mom.gov.sg",
    "Work pass, employment issues, workplace safety",
)];

const SECURITY: &[Entry] = &[(
    "Singapore Police Force",
    "1800-255-0000",
    "https://www.police.gov.sg",
    "Crime reporting, community safety",
)];

const GENERAL: &[Entry] = &[
    (
        "OneService App",
        "Municipal Services",
        "https://www.oneservice.gov.sg",
        "Municipal issues like cleanliness, lighting, infrastructure",
    ),
    (
        "REACH",
        "Whole-of-Government Feedback",
        "https://www.reach.gov.sg",
        "General government feedback and engagement",
    ),
];

/// Checked in order against free-form categories. Water issues go to PUB,
/// which sits in the transport list.
const SYNONYMS: &[(&str, &str)] = &[
    ("mrt", "transport"),
    ("bus", "transport"),
    ("road", "transport"),
    ("traffic", "transport"),
    ("hdb", "housing"),
    ("flat", "housing"),
    ("apartment", "housing"),
    ("hospital", "healthcare"),
    ("clinic", "healthcare"),
    ("doctor", "healthcare"),
    ("school", "education"),
    ("student", "education"),
    ("job", "employment"),
    ("work", "employment"),
    ("salary", "employment"),
    ("police", "security"),
    ("crime", "security"),
    ("safety", "security"),
    ("noise", "environment"),
    ("cleanliness", "environment"),
    ("pollution", "environment"),
    ("water", "transport"),
    ("electricity", "general"),
    ("municipal", "general"),
];

fn table(category: &str) -> Option<&'static [Entry]> {
    Some(match category {
        "housing" => HOUSING,
        "transport" => TRANSPORT,
        "healthcare" => HEALTHCARE,
        "environment" => ENVIRONMENT,
        "education" => EDUCATION,
        "employment" => EMPLOYMENT,
        "security" => SECURITY,
        "general" => GENERAL,
        _ => return None,
    })
}

/// Singapore government agencies, keyed by complaint category.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgencyDirectory;

impl AgencyDirectory {
    pub fn new() -> Self {
        Self
    }

    fn entries(category: &str) -> &'static [Entry] {
        let category = category.trim().to_lowercase();
        if let Some(entries) = table(&category) {
            return entries;
        }
        SYNONYMS
            .iter()
            .find(|(keyword, _)| category.contains(keyword))
            .and_then(|(_, mapped)| table(mapped))
            .unwrap_or(GENERAL)
    }
}

impl ResourceDirectory for AgencyDirectory {
    fn resources_for_category(&self, category: &str) -> Vec<Resource> {
        Self::entries(category)
            .iter()
            .map(|(name, contact, website, description)| Resource {
                name: name.to_string(),
                contact: contact.to_string(),
                website: website.to_string(),
                description: description.to_string(),
            })
            .collect()
    }
}
