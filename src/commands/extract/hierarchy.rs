use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Province,
    District,
    Commune,
}

impl LocationType {
    /// The level is encoded only in the trailing zeros of the code.
    pub fn from_code(code: &str) -> Self {
        if code.ends_with("0000") {
            LocationType::Province
        } else if code.ends_with("00") {
            LocationType::District
        } else {
            LocationType::Commune
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LocationType::Province => "province",
            LocationType::District => "district",
            LocationType::Commune => "commune",
        }
    }
}

/// One row of the output table. Field order is the CSV column order; `code`
/// is the row's own location code and only goes to the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    #[serde(skip)]
    pub code: String,
    pub postal_code: String,
    #[serde(rename = "name_km")]
    pub name_local: String,
    pub name_en: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub province_code: String,
    pub district_code: String,
    #[serde(rename = "province_name_km")]
    pub province_name_local: String,
    pub province_name_en: String,
    #[serde(rename = "district_name_km")]
    pub district_name_local: String,
    pub district_name_en: String,
}

/// How often an ancestor code had to be derived from the child's own digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AncestorFallbacks {
    pub district_without_province: usize,
    pub commune_without_province: usize,
    pub commune_without_district: usize,
}

impl AncestorFallbacks {
    pub fn total(&self) -> usize {
        self.district_without_province
            + self.commune_without_province
            + self.commune_without_district
    }
}

/// Most recent province and district seen in document order. Empty strings
/// mean "not seen yet in this run".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyContext {
    pub current_province_code: String,
    pub current_province_name_local: String,
    pub current_province_name_en: String,
    pub current_district_code: String,
    pub current_district_name_local: String,
    pub current_district_name_en: String,
    pub fallbacks: AncestorFallbacks,
}

impl HierarchyContext {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn enter_province(&mut self, record: &CandidateRecord) {
        self.current_province_code = record.code.clone();
        self.current_province_name_local = record.name_local.clone();
        self.current_province_name_en = record.name_en.clone();
        self.clear_district();
    }

    fn enter_district(&mut self, record: &CandidateRecord) {
        self.current_district_code = record.code.clone();
        self.current_district_name_local = record.name_local.clone();
        self.current_district_name_en = record.name_en.clone();
    }

    fn clear_district(&mut self) {
        self.current_district_code.clear();
        self.current_district_name_local.clear();
        self.current_district_name_en.clear();
    }
}

fn derived_province_code(code: &str) -> String {
    format!("{}0000", code.get(..2).unwrap_or(code))
}

fn derived_district_code(code: &str) -> String {
    format!("{}00", code.get(..4).unwrap_or(code))
}

/// Assigns the record its level and ancestors. Must be called in document
/// order: a province resets the district slot, a district replaces it, and a
/// commune only reads it.
pub fn classify(record: CandidateRecord, context: &mut HierarchyContext) -> LocationEntry {
    let location_type = LocationType::from_code(&record.code);

    let (province_code, district_code) = match location_type {
        LocationType::Province => {
            context.enter_province(&record);
            (record.code.clone(), String::new())
        }
        LocationType::District => {
            let province_code = if context.current_province_code.is_empty() {
                context.fallbacks.district_without_province += 1;
                derived_province_code(&record.code)
            } else {
                context.current_province_code.clone()
            };
            context.enter_district(&record);
            (province_code, record.code.clone())
        }
        LocationType::Commune => {
            let province_code = if context.current_province_code.is_empty() {
                context.fallbacks.commune_without_province += 1;
                derived_province_code(&record.code)
            } else {
                context.current_province_code.clone()
            };
            let district_code = if context.current_district_code.is_empty() {
                context.fallbacks.commune_without_district += 1;
                derived_district_code(&record.code)
            } else {
                context.current_district_code.clone()
            };
            (province_code, district_code)
        }
    };

    let (province_name_local, province_name_en, district_name_local, district_name_en) =
        if location_type == LocationType::Commune {
            (
                context.current_province_name_local.clone(),
                context.current_province_name_en.clone(),
                context.current_district_name_local.clone(),
                context.current_district_name_en.clone(),
            )
        } else {
            Default::default()
        };

    LocationEntry {
        code: record.code,
        postal_code: record.postal_code,
        name_local: record.name_local,
        name_en: record.name_en,
        location_type,
        province_code,
        district_code,
        province_name_local,
        province_name_en,
        district_name_local,
        district_name_en,
    }
}
