//! Keyword tables behind the trap rules.
//!
//! Plain data records, built in or loaded from JSON. Matching goes through
//! [`crate::utils::contains_term`].

use crate::model::ConfigError;
use crate::utils::contains_any;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Bilingual surface forms of one ingredient or brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientConcept {
    pub name: String,
    pub terms: Vec<String>,
    /// Compound words that contain a term but name something else
    /// ("ขนมปังนมสด" is bread, not milk).
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl IngredientConcept {
    pub fn mentioned_in(&self, text: &str) -> bool {
        contains_any(text, &self.terms) && !contains_any(text, &self.excludes)
    }
}

/// When the query mentions a trigger cut, names mentioning an avoid term are wrong cuts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeatCutRule {
    pub triggers: Vec<String>,
    pub avoid: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub ingredient_concepts: Vec<IngredientConcept>,
    pub meat_cut_rules: Vec<MeatCutRule>,
    pub low_quality_parts: Vec<String>,
    pub pet_food: Vec<String>,
    pub pet_query_terms: Vec<String>,
    pub non_food: Vec<String>,
    pub processed_food: Vec<String>,
    pub liquids: Vec<String>,
    pub safe_liquids: Vec<String>,
    /// Prefix words of a size/grade number ("no. 2", "เบอร์ 0").
    pub size_markers: Vec<String>,
}

const INGREDIENT_CONCEPTS: &[(&str, &[&str])] = &[
    ("coke", &["coke", "coca-cola", "coca cola", "cocacola", "โค้ก", "โคคา-โคลา", "โคคาโคล่า"]),
    ("pepsi", &["pepsi", "เป๊ปซี่"]),
    ("sprite", &["sprite", "สไปรท์"]),
    ("pork", &["pork", "หมู"]),
    ("chicken", &["chicken", "ไก่"]),
    ("beef", &["beef", "เนื้อวัว"]),
    ("fish", &["fish", "ปลา"]),
    ("salmon", &["salmon", "แซลมอน"]),
    ("shrimp", &["shrimp", "prawn", "prawns", "กุ้ง"]),
    ("squid", &["squid", "ปลาหมึก"]),
    ("egg", &["egg", "eggs", "ไข่"]),
    (
        "milk",
        &["milk", "นมสด", "นมวัว", "นมจืด", "นมยูเอชที", "นมพาสเจอร์ไรส์", "นมถั่วเหลือง"],
    ),
    ("rice", &["rice", "ข้าวสาร", "ข้าวหอมมะลิ"]),
    ("sugar", &["sugar", "น้ำตาล"]),
    ("fish sauce", &["fish sauce", "น้ำปลา"]),
    ("soy sauce", &["soy sauce", "ซีอิ๊ว"]),
    ("cooking oil", &["cooking oil", "vegetable oil", "palm oil", "น้ำมันพืช", "น้ำมันปาล์ม"]),
    ("tofu", &["tofu", "เต้าหู้"]),
    ("noodles", &["noodle", "noodles", "บะหมี่", "ก๋วยเตี๋ยว"]),
    ("water", &["drinking water", "water", "น้ำดื่ม"]),
    ("garlic", &["garlic", "กระเทียม"]),
    ("onion", &["onion", "onions", "หัวหอม"]),
    ("cabbage", &["cabbage", "กะหล่ำปลี"]),
    ("banana", &["banana", "bananas", "กล้วย"]),
];

const CONCEPT_EXCLUDES: &[(&str, &[&str])] = &[
    ("milk", &["bread", "biscuit", "biscuits", "cookie", "cookies", "snack", "ขนม"]),
];

const MEAT_CUT_RULES: &[(&[&str], &[&str])] = &[
    (
        &["collar", "neck", "สันคอ", "คอหมู"],
        &["loin", "sirloin", "tenderloin", "belly", "สันใน", "สันนอก", "สามชั้น"],
    ),
    (
        &["belly", "สามชั้น"],
        &["loin", "sirloin", "tenderloin", "collar", "minced", "สันใน", "สันนอก", "สันคอ", "หมูสับ"],
    ),
    (
        &["loin", "tenderloin", "sirloin", "สันใน", "สันนอก"],
        &["collar", "belly", "minced", "สันคอ", "สามชั้น", "หมูสับ"],
    ),
    (
        &["minced", "ground", "หมูสับ", "ไก่สับ", "เนื้อสับ", "บด"],
        &["steak", "slice", "sliced", "fillet", "สไลซ์", "สเต็ก"],
    ),
    (
        &["breast", "อกไก่"],
        &["thigh", "thighs", "wing", "wings", "drumstick", "drumsticks", "สะโพก", "ปีกไก่", "น่องไก่"],
    ),
    (
        &["thigh", "thighs", "สะโพก"],
        &["breast", "wing", "wings", "อกไก่", "ปีกไก่"],
    ),
    (
        &["wing", "wings", "ปีกไก่", "ปีกบน", "ปีกกลาง"],
        &["breast", "thigh", "thighs", "drumstick", "drumsticks", "อกไก่", "สะโพก", "น่องไก่"],
    ),
    (
        &["drumstick", "drumsticks", "น่องไก่"],
        &["breast", "wing", "wings", "อกไก่", "ปีกไก่"],
    ),
    (
        &["rib", "ribs", "spare rib", "ซี่โครง"],
        &["loin", "belly", "สันใน", "สามชั้น"],
    ),
];

const LOW_QUALITY_PARTS: &[&str] = &[
    "head", "heads", "bone", "bones", "skin", "offal", "feet", "foot", "liver", "intestine",
    "intestines", "blood", "gizzard", "gizzards", "cartilage", "tail", "หัวหมู", "หัวปลา",
    "หัวไก่", "กระดูก", "หนังหมู", "หนังไก่", "เครื่องใน", "ตีนไก่", "ขาหมู", "ตับ", "ไส้",
    "เลือด", "กึ๋น", "เอ็น", "ข้อไก่",
];

const PET_FOOD: &[&str] = &[
    "cat food", "dog food", "pet food", "kitten", "puppy", "whiskas", "pedigree", "me-o",
    "meo", "smartheart", "royal canin", "friskies", "jerhigh", "cat", "cats", "dog", "dogs",
    "อาหารแมว", "อาหารสุนัข", "อาหารหมา", "ขนมแมว", "ขนมสุนัข", "สัตว์เลี้ยง",
];

const PET_QUERY_TERMS: &[&str] = &[
    "cat", "cats", "dog", "dogs", "pet", "pets", "kitten", "puppy", "แมว", "สุนัข", "หมา",
    "สัตว์เลี้ยง",
];

const NON_FOOD: &[&str] = &[
    "toy", "toys", "plush", "doll", "figure", "keychain", "sticker", "t-shirt", "shirt",
    "apparel", "costume", "shampoo", "soap", "detergent", "ของเล่น", "ตุ๊กตา", "พวงกุญแจ",
    "สติ๊กเกอร์", "เสื้อ", "แชมพู", "สบู่", "ผงซักฟอก",
];

const PROCESSED_FOOD: &[&str] = &[
    "baby", "infant", "toddler", "puree", "cerelac", "sausage", "sausages", "ham", "bacon",
    "meatball", "meatballs", "nugget", "nuggets", "instant", "ready meal", "ready to eat",
    "marinated", "ทารก", "สำหรับเด็ก", "อาหารเด็ก", "ไส้กรอก", "ลูกชิ้น", "แฮม", "เบคอน",
    "นักเก็ต", "กึ่งสำเร็จรูป", "พร้อมทาน", "หมัก",
];

const LIQUIDS: &[&str] = &[
    "drink", "drinks", "beverage", "juice", "water", "soda", "tea", "coffee", "smoothie",
    "เครื่องดื่ม", "น้ำดื่ม", "น้ำแร่", "น้ำผลไม้", "น้ำส้ม", "น้ำอัดลม", "ชาเขียว", "ชานม",
    "กาแฟ",
];

const SAFE_LIQUIDS: &[&str] = &[
    "sauce", "oil", "vinegar", "milk", "yogurt", "cream", "soy", "coke", "coca-cola", "pepsi",
    "sprite", "fanta", "ซอส", "น้ำมัน", "น้ำปลา", "น้ำส้มสายชู", "ซีอิ๊ว", "นมสด", "นมวัว",
    "นมจืด", "นมยูเอชที", "นมถั่วเหลือง", "โยเกิร์ต",
    "โค้ก", "เป๊ปซี่", "สไปรท์",
];

const SIZE_MARKERS: &[&str] = &["no.", "no", "size", "เบอร์"];

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

impl KnowledgeBase {
    /// The built-in Thai/English grocery tables.
    pub fn builtin() -> Self {
        Self {
            ingredient_concepts: INGREDIENT_CONCEPTS
                .iter()
                .map(|(name, terms)| IngredientConcept {
                    name: name.to_string(),
                    terms: owned(terms),
                    excludes: CONCEPT_EXCLUDES
                        .iter()
                        .find(|(concept, _)| concept == name)
                        .map(|(_, words)| owned(words))
                        .unwrap_or_default(),
                })
                .collect(),
            meat_cut_rules: MEAT_CUT_RULES
                .iter()
                .map(|(triggers, avoid)| MeatCutRule {
                    triggers: owned(triggers),
                    avoid: owned(avoid),
                })
                .collect(),
            low_quality_parts: owned(LOW_QUALITY_PARTS),
            pet_food: owned(PET_FOOD),
            pet_query_terms: owned(PET_QUERY_TERMS),
            non_food: owned(NON_FOOD),
            processed_food: owned(PROCESSED_FOOD),
            liquids: owned(LIQUIDS),
            safe_liquids: owned(SAFE_LIQUIDS),
            size_markers: owned(SIZE_MARKERS),
        }
    }

    /// Loads a full table set from a JSON file. Terms are lowercased on load.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut kb: KnowledgeBase = serde_json::from_str(&content)?;
        kb.lowercase_terms();
        Ok(kb)
    }

    /// Concepts that both texts mention.
    pub fn shared_concepts<'a>(&'a self, query: &str, name: &str) -> Vec<&'a IngredientConcept> {
        self.ingredient_concepts
            .iter()
            .filter(|c| c.mentioned_in(query) && c.mentioned_in(name))
            .collect()
    }

    fn lowercase_terms(&mut self) {
        let lower = |terms: &mut Vec<String>| {
            for t in terms.iter_mut() {
                *t = t.to_lowercase();
            }
        };
        for concept in &mut self.ingredient_concepts {
            lower(&mut concept.terms);
            lower(&mut concept.excludes);
        }
        for rule in &mut self.meat_cut_rules {
            lower(&mut rule.triggers);
            lower(&mut rule.avoid);
        }
        lower(&mut self.low_quality_parts);
        lower(&mut self.pet_food);
        lower(&mut self.pet_query_terms);
        lower(&mut self.non_food);
        lower(&mut self.processed_food);
        lower(&mut self.liquids);
        lower(&mut self.safe_liquids);
        lower(&mut self.size_markers);
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_tables_are_lowercase() {
        let kb = KnowledgeBase::builtin();
        let all = kb
            .pet_food
            .iter()
            .chain(&kb.non_food)
            .chain(&kb.processed_food)
            .chain(&kb.liquids)
            .chain(&kb.safe_liquids)
            .chain(&kb.low_quality_parts);
        for term in all {
            assert_eq!(term, &term.to_lowercase());
        }
    }

    #[test]
    fn coke_concept_links_brand_spellings() {
        let kb = KnowledgeBase::builtin();
        let shared = kb.shared_concepts("coke", "coca-cola can 325ml");
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].name, "coke");
        assert!(kb.shared_concepts("coke", "whiskas cat food 1kg").is_empty());
    }

    #[test]
    fn concept_links_thai_and_english() {
        let kb = KnowledgeBase::builtin();
        let names: Vec<_> = kb
            .shared_concepts("pork collar", "หมูสันคอสไลซ์ 500 กรัม")
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["pork"]);
    }

    #[test]
    fn milk_concept_skips_thai_bread() {
        let kb = KnowledgeBase::builtin();
        assert!(kb.shared_concepts("milk", "ขนมปังนมสด").is_empty());
        assert!(kb.shared_concepts("milk", "bread milk flavour").is_empty());
        let shared = kb.shared_concepts("milk", "นมสดพาสเจอร์ไรส์ 2 ลิตร");
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].name, "milk");
    }

    #[test]
    fn loads_tables_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut kb = KnowledgeBase::builtin();
        kb.non_food = vec!["Candle".into()];
        write!(file, "{}", serde_json::to_string(&kb).unwrap()).unwrap();

        let loaded = KnowledgeBase::load(file.path()).unwrap();
        assert_eq!(loaded.non_food, vec!["candle".to_string()]);
        assert_eq!(loaded.meat_cut_rules.len(), kb.meat_cut_rules.len());
    }
}
