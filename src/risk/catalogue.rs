//! Static disease catalogue.

use super::formulas;
use crate::types::DiseaseDefinition;

pub const DENGUE_FEVER: &str = "Dengue Fever";
pub const MALARIA: &str = "Malaria";
pub const INFLUENZA: &str = "Influenza";
pub const COMMON_COLD: &str = "Common Cold";
pub const HEAT_STROKE: &str = "Heat Stroke";
pub const ASTHMA_EXACERBATION: &str = "Asthma Exacerbation";
pub const CHOLERA: &str = "Cholera";
pub const LEPTOSPIROSIS: &str = "Leptospirosis";

/// Number of diseases in the catalogue (width of the disease model's output).
pub const NUM_DISEASES: usize = 8;

/// The catalogue, in the fixed order used by every per-disease vector.
pub static DISEASE_CATALOGUE: [DiseaseDefinition; NUM_DISEASES] = [
    DiseaseDefinition {
        name: DENGUE_FEVER,
        specialty: "Infectious Disease",
        base_doctors_required: 8,
        risk_formula: formulas::dengue_risk,
        symptoms: &["High fever", "Severe headache", "Pain behind the eyes", "Joint and muscle pain", "Rash"],
        prevention_tips: &[
            "Remove standing water around homes",
            "Use mosquito repellent and nets",
            "Wear long sleeves at dawn and dusk",
        ],
    },
    DiseaseDefinition {
        name: MALARIA,
        specialty: "Infectious Disease",
        base_doctors_required: 6,
        risk_formula: formulas::malaria_risk,
        symptoms: &["Cyclical fever", "Chills", "Sweating", "Fatigue", "Nausea"],
        prevention_tips: &[
            "Sleep under insecticide-treated nets",
            "Apply indoor residual spraying",
            "Seek testing promptly for fever",
        ],
    },
    DiseaseDefinition {
        name: INFLUENZA,
        specialty: "General Medicine",
        base_doctors_required: 10,
        risk_formula: formulas::influenza_risk,
        symptoms: &["Fever", "Cough", "Sore throat", "Body aches", "Fatigue"],
        prevention_tips: &[
            "Get the seasonal vaccine",
            "Wash hands frequently",
            "Ventilate indoor spaces",
        ],
    },
    DiseaseDefinition {
        name: COMMON_COLD,
        specialty: "General Medicine",
        base_doctors_required: 5,
        risk_formula: formulas::common_cold_risk,
        symptoms: &["Runny nose", "Sneezing", "Sore throat", "Mild cough"],
        prevention_tips: &[
            "Wash hands frequently",
            "Avoid touching the face",
            "Keep warm and dry",
        ],
    },
    DiseaseDefinition {
        name: HEAT_STROKE,
        specialty: "Emergency Medicine",
        base_doctors_required: 6,
        risk_formula: formulas::heat_stroke_risk,
        symptoms: &["Body temperature above 40°C", "Confusion", "Hot dry skin", "Rapid pulse"],
        prevention_tips: &[
            "Stay hydrated",
            "Avoid outdoor exertion at midday",
            "Check on elderly neighbours",
        ],
    },
    DiseaseDefinition {
        name: ASTHMA_EXACERBATION,
        specialty: "Pulmonology",
        base_doctors_required: 5,
        risk_formula: formulas::asthma_risk,
        symptoms: &["Wheezing", "Shortness of breath", "Chest tightness", "Night-time cough"],
        prevention_tips: &[
            "Carry reliever inhaler",
            "Stay indoors during thunderstorms",
            "Follow the asthma action plan",
        ],
    },
    DiseaseDefinition {
        name: CHOLERA,
        specialty: "Gastroenterology",
        base_doctors_required: 7,
        risk_formula: formulas::cholera_risk,
        symptoms: &["Profuse watery diarrhoea", "Vomiting", "Dehydration", "Leg cramps"],
        prevention_tips: &[
            "Drink boiled or treated water",
            "Avoid raw food after flooding",
            "Use oral rehydration salts early",
        ],
    },
    DiseaseDefinition {
        name: LEPTOSPIROSIS,
        specialty: "Infectious Disease",
        base_doctors_required: 4,
        risk_formula: formulas::leptospirosis_risk,
        symptoms: &["Fever", "Muscle pain (calves)", "Red eyes", "Jaundice"],
        prevention_tips: &[
            "Avoid wading in flood water",
            "Wear boots and gloves when cleaning up",
            "Control rodents around homes",
        ],
    },
];

/// Disease names in catalogue order.
pub fn disease_names() -> Vec<&'static str> {
    DISEASE_CATALOGUE.iter().map(|d| d.name).collect()
}
