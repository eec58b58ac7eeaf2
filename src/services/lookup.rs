//! Reference data: countries, provinces and dental social programs.
//!
//! Records carry both display names plus a stable id. Validators only ever
//! compare ids; the names are for whoever renders the page.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::locale::Locale;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Country {
    pub id: String,
    pub name_en: String,
    pub name_fr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Province {
    pub id: String,
    pub country_id: String,
    pub abbreviation: String,
    pub name_en: String,
    pub name_fr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocialProgram {
    pub id: String,
    /// Set for provincial and territorial programs
    pub province_id: Option<String>,
    pub name_en: String,
    pub name_fr: String,
}

/// Localized name of a record
pub fn display_name<'a>(locale: Locale, name_en: &'a str, name_fr: &'a str) -> &'a str {
    match locale {
        Locale::En => name_en,
        Locale::Fr => name_fr,
    }
}

/// Source of the lists offered by select fields
pub trait ReferenceData: Send + Sync {
    fn countries(&self) -> Vec<Country>;

    /// Provinces, territories and states of every country
    fn provinces(&self) -> Vec<Province>;

    fn federal_programs(&self) -> Vec<SocialProgram>;

    fn provincial_programs(&self, province_id: &str) -> Vec<SocialProgram>;

    fn country_by_id(&self, id: &str) -> Option<Country> {
        self.countries().into_iter().find(|c| c.id == id)
    }

    fn province_by_id(&self, id: &str) -> Option<Province> {
        self.provinces().into_iter().find(|p| p.id == id)
    }

    fn provinces_of(&self, country_id: &str) -> Vec<Province> {
        self.provinces()
            .into_iter()
            .filter(|p| p.country_id == country_id)
            .collect()
    }

    fn federal_program_by_id(&self, id: &str) -> Option<SocialProgram> {
        self.federal_programs().into_iter().find(|p| p.id == id)
    }

    fn provincial_program_by_id(&self, province_id: &str, id: &str) -> Option<SocialProgram> {
        self.provincial_programs(province_id)
            .into_iter()
            .find(|p| p.id == id)
    }
}

const COUNTRIES: &[(&str, &str, &str)] = &[
    ("CAN", "Canada", "Canada"),
    ("USA", "United States", "États-Unis"),
    ("GBR", "United Kingdom", "Royaume-Uni"),
    ("FRA", "France", "France"),
    ("MEX", "Mexico", "Mexique"),
    ("IND", "India", "Inde"),
    ("PHL", "Philippines", "Philippines"),
    ("CHN", "China", "Chine"),
];

const CANADIAN_PROVINCES: &[(&str, &str, &str)] = &[
    ("AB", "Alberta", "Alberta"),
    ("BC", "British Columbia", "Colombie-Britannique"),
    ("MB", "Manitoba", "Manitoba"),
    ("NB", "New Brunswick", "Nouveau-Brunswick"),
    ("NL", "Newfoundland and Labrador", "Terre-Neuve-et-Labrador"),
    ("NS", "Nova Scotia", "Nouvelle-Écosse"),
    ("NT", "Northwest Territories", "Territoires du Nord-Ouest"),
    ("NU", "Nunavut", "Nunavut"),
    ("ON", "Ontario", "Ontario"),
    ("PE", "Prince Edward Island", "Île-du-Prince-Édouard"),
    ("QC", "Quebec", "Québec"),
    ("SK", "Saskatchewan", "Saskatchewan"),
    ("YT", "Yukon", "Yukon"),
];

const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

const FEDERAL_PROGRAMS: &[(&str, &str, &str)] = &[
    (
        "CAF",
        "Canadian Forces Health Services",
        "Services de santé des Forces canadiennes",
    ),
    (
        "NIHB",
        "Non-Insured Health Benefits Program",
        "Programme des services de santé non assurés",
    ),
    (
        "VAC",
        "Veterans Affairs Canada",
        "Anciens Combattants Canada",
    ),
    (
        "IFHP",
        "Interim Federal Health Program",
        "Programme fédéral de santé intérimaire",
    ),
];

const PROVINCIAL_PROGRAMS: &[(&str, &str, &str, &str)] = &[
    ("AB-ACHB", "AB", "Alberta Child Health Benefit", "Prestations de santé pour enfants de l'Alberta"),
    ("AB-AADL", "AB", "Alberta Adult Health Benefit", "Prestations de santé pour adultes de l'Alberta"),
    ("BC-HDP", "BC", "Healthy Kids Program", "Programme Healthy Kids"),
    ("MB-EIA", "MB", "Employment and Income Assistance", "Aide à l'emploi et au revenu"),
    ("NB-HSP", "NB", "Healthy Smiles, Clear Vision", "Beaux sourires, bonne vision"),
    ("NL-MCP", "NL", "Children's Dental Health Program", "Programme de soins dentaires pour enfants"),
    ("NS-CODP", "NS", "Children's Oral Health Program", "Programme de santé buccodentaire pour enfants"),
    ("NT-EHB", "NT", "Extended Health Benefits", "Prestations de santé complémentaires"),
    ("NU-EHB", "NU", "Extended Health Benefits", "Prestations de santé complémentaires"),
    ("ON-HSO", "ON", "Healthy Smiles Ontario", "Beaux sourires Ontario"),
    ("ON-ODSP", "ON", "Ontario Disability Support Program", "Programme ontarien de soutien aux personnes handicapées"),
    ("ON-OW", "ON", "Ontario Works", "Ontario au travail"),
    ("PE-CDCP", "PE", "Children's Dental Care Program", "Programme de soins dentaires pour enfants"),
    ("QC-RAMQ", "QC", "Régie de l'assurance maladie du Québec", "Régie de l'assurance maladie du Québec"),
    ("SK-SAP", "SK", "Saskatchewan Assistance Program", "Programme d'aide de la Saskatchewan"),
    ("YT-CDP", "YT", "Children's Dental Program", "Programme de soins dentaires pour enfants"),
];

static SEED: Lazy<Seed> = Lazy::new(Seed::build);

struct Seed {
    countries: Vec<Country>,
    provinces: Vec<Province>,
    federal_programs: Vec<SocialProgram>,
    provincial_programs: Vec<SocialProgram>,
}

impl Seed {
    fn build() -> Self {
        let countries = COUNTRIES
            .iter()
            .map(|(id, en, fr)| Country {
                id: (*id).to_string(),
                name_en: (*en).to_string(),
                name_fr: (*fr).to_string(),
            })
            .collect();

        let canadian = CANADIAN_PROVINCES.iter().map(|(abbr, en, fr)| Province {
            id: (*abbr).to_string(),
            country_id: "CAN".to_string(),
            abbreviation: (*abbr).to_string(),
            name_en: (*en).to_string(),
            name_fr: (*fr).to_string(),
        });
        let american = US_STATES.iter().map(|(abbr, name)| Province {
            id: format!("US-{abbr}"),
            country_id: "USA".to_string(),
            abbreviation: (*abbr).to_string(),
            name_en: (*name).to_string(),
            name_fr: (*name).to_string(),
        });

        let federal_programs = FEDERAL_PROGRAMS
            .iter()
            .map(|(id, en, fr)| SocialProgram {
                id: (*id).to_string(),
                province_id: None,
                name_en: (*en).to_string(),
                name_fr: (*fr).to_string(),
            })
            .collect();
        let provincial_programs = PROVINCIAL_PROGRAMS
            .iter()
            .map(|(id, province, en, fr)| SocialProgram {
                id: (*id).to_string(),
                province_id: Some((*province).to_string()),
                name_en: (*en).to_string(),
                name_fr: (*fr).to_string(),
            })
            .collect();

        Self {
            countries,
            provinces: canadian.chain(american).collect(),
            federal_programs,
            provincial_programs,
        }
    }
}

/// Built-in Canadian reference lists
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticReferenceData;

impl ReferenceData for StaticReferenceData {
    fn countries(&self) -> Vec<Country> {
        SEED.countries.clone()
    }

    fn provinces(&self) -> Vec<Province> {
        SEED.provinces.clone()
    }

    fn federal_programs(&self) -> Vec<SocialProgram> {
        SEED.federal_programs.clone()
    }

    fn provincial_programs(&self, province_id: &str) -> Vec<SocialProgram> {
        SEED.provincial_programs
            .iter()
            .filter(|p| p.province_id.as_deref() == Some(province_id))
            .cloned()
            .collect()
    }
}
