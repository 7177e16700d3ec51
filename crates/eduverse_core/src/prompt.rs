//! crates/eduverse_core/src/prompt.rs
//!
//! Pure rendering of the instruction strings sent to the completion API.
//! One function per use case; every function is side-effect free and takes a
//! resolved [`Language`] rather than a raw tag, so the two-way language
//! switch lives in exactly one place ([`Language::from_tag`]).

use chrono::{Datelike, NaiveDate};

use crate::domain::{JobsRequest, Language};

/// Ages strictly below this get the child-friendly chat register.
pub const CHILD_AGE_CUTOFF: i32 = 15;

/// Devanagari month names, January first.
const HINDI_MONTHS: [&str; 12] = [
    "जनवरी",
    "फ़रवरी",
    "मार्च",
    "अप्रैल",
    "मई",
    "जून",
    "जुलाई",
    "अगस्त",
    "सितंबर",
    "अक्टूबर",
    "नवंबर",
    "दिसंबर",
];

fn hindi_month(date: NaiveDate) -> &'static str {
    HINDI_MONTHS[date.month0() as usize]
}

/// `"15 अगस्त 2025"` style formatting, as the product has always shown dates.
pub fn format_date_hindi(date: NaiveDate) -> String {
    format!("{} {} {}", date.day(), hindi_month(date), date.year())
}

/// Trims an optional field and drops it entirely when blank, so templates
/// never end up with dangling punctuation around an empty value.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

//=========================================================================================
// Chat
//=========================================================================================

/// The free-form chat prompt, with a register chosen from the asker's age.
pub fn chat_prompt(message: &str, language: Language, age: Option<i32>) -> String {
    match language {
        Language::English => {
            let register = match age {
                Some(a) if a < CHILD_AGE_CUTOFF => format!(
                    "Explain it the way you would to a {}-year-old, with simple words and friendly examples.",
                    a
                ),
                Some(_) => {
                    "Keep the explanation clear and suitable for an adult learner.".to_string()
                }
                None => "Keep the explanation simple and easy to follow.".to_string(),
            };
            format!(
                "Answer the following question clearly and accurately. {} \
                 Stay under 300 words and use short paragraphs or bullet points. \
                 Question: {}",
                register, message
            )
        }
        Language::Hindi => {
            let register = match age {
                Some(a) if a < CHILD_AGE_CUTOFF => format!(
                    "इसे ऐसे समझाएँ जैसे आप {} साल के बच्चे को समझा रहे हों, सरल शब्दों और दोस्ताना उदाहरणों के साथ।",
                    a
                ),
                Some(_) => "उत्तर स्पष्ट रखें और एक वयस्क विद्यार्थी के लिए उपयुक्त हो।".to_string(),
                None => "उत्तर सरल और समझने में आसान रखें।".to_string(),
            };
            format!(
                "निम्नलिखित प्रश्न का उत्तर स्पष्ट और सटीक रूप से दें। {} \
                 अधिकतम 300 शब्द, छोटे अनुच्छेद या बुलेट पॉइंट्स में। \
                 कृपया हिंदी (देवनागरी लिपि) में उत्तर दें। प्रश्न: {}",
                register, message
            )
        }
    }
}

//=========================================================================================
// Career guidance
//=========================================================================================

/// The career-guidance prompt. Interests and preferred field are appended
/// only when present; the numbered five-section structure and the stated
/// word budget are what keep the model's answers consistently shaped.
pub fn career_prompt(
    qualification: &str,
    interests: Option<&str>,
    preferred_field: Option<&str>,
    language: Language,
) -> String {
    let interests = non_blank(interests);
    let preferred_field = non_blank(preferred_field);

    match language {
        Language::English => {
            let mut prompt = format!("Quick career guide for {}", qualification);
            if let Some(interests) = interests {
                prompt.push_str(&format!(" with interest in {}", interests));
            }
            if let Some(field) = preferred_field {
                prompt.push_str(&format!(" focusing on {}", field));
            }
            prompt.push_str(
                ". Provide in 250 words: \
                 1) Top 3 career paths \
                 2) Best 2 institutions \
                 3) Key skills \
                 4) Salary range \
                 5) Next step. \
                 Use bullet points, be direct.",
            );
            prompt
        }
        Language::Hindi => {
            let mut prompt = format!("{} के लिए त्वरित करियर गाइड", qualification);
            if let Some(interests) = interests {
                prompt.push_str(&format!(", रुचि: {}", interests));
            }
            if let Some(field) = preferred_field {
                prompt.push_str(&format!(", क्षेत्र: {}", field));
            }
            prompt.push_str(
                "। 250 शब्दों में दें: \
                 1) शीर्ष 3 करियर \
                 2) सर्वोत्तम 2 संस्थान \
                 3) मुख्य कौशल \
                 4) वेतन \
                 5) अगला कदम। \
                 बुलेट पॉइंट्स, सीधे जवाब।",
            );
            prompt
        }
    }
}

//=========================================================================================
// Government jobs
//=========================================================================================

/// The government-jobs prompt. The model is told to answer with bare JSON of
/// a fixed shape; the gateway passes that JSON through to the caller without
/// parsing it.
pub fn government_jobs_prompt(request: &JobsRequest) -> String {
    format!(
        "List all current government job openings in India for a student with the following profile:\n\
         - Qualification: {}\n\
         - Field of study: {}\n\
         - Age: {}\n\
         - Location preference: {}\n\
         - Job type preference: {}\n\n\
         Give the response in a clean JSON format with the following structure:\n\
         {{\n\
           \"jobs\": [\n\
             {{\n\
               \"job_title\": \"Job Title\",\n\
               \"department_organization\": \"Department/Organization Name\",\n\
               \"qualification_required\": \"Required Qualification\",\n\
               \"last_date_to_apply\": \"Last Date\",\n\
               \"application_link\": \"Application URL\",\n\
               \"location\": \"Job Location\"\n\
             }}\n\
           ]\n\
         }}\n\n\
         Provide only the JSON response without any additional text or formatting. \
         Include only currently open and active government job postings that match the profile, \
         whose last date to apply has not passed. \
         If no specific jobs are available, provide general categories of government jobs suitable for the profile.",
        request.qualification, request.field_of_study, request.age, request.location, request.job_type
    )
}

//=========================================================================================
// Daily history
//=========================================================================================

/// The once-per-day history story prompt for a given date.
pub fn daily_history_prompt(date: NaiveDate) -> String {
    format!(
        "Tell me in a story form why {} {} is important in Indian history, \
         as if you're explaining it to a 20-year-old child. The language should be simple, \
         emotional, and memorable. Let it flow like a poem, with a touch of love, a sense of pride, \
         and warmth like a scholar telling a bedtime story. Make it so touching and \
         beautiful that I never forget it for the rest of my life. \
         Please respond in Hindi (Devanagari script).",
        date.day(),
        hindi_month(date)
    )
}

/// Deterministic stand-in used when generation fails. Deliberately free of
/// question marks so it always survives the corruption check.
pub fn default_history_message(date: NaiveDate) -> String {
    format!(
        "आज {} का दिन है। हर दिन भारतीय इतिहास में कुछ न कुछ खास होता है। \
         आज का दिन भी अपने आप में विशेष है। हमारे देश की महान परंपरा और संस्कृति को \
         आगे बढ़ाने का दिन है। आइए मिलकर इस दिन को यादगार बनाते हैं।",
        format_date_hindi(date)
    )
}

//=========================================================================================
// Quota notice
//=========================================================================================

/// The localized warning appended when a user is close to the daily limit.
pub fn low_quota_notice(remaining: i32, language: Language) -> String {
    match language {
        Language::English => format!("\n\n[You have {} questions remaining today]", remaining),
        Language::Hindi => format!("\n\n[आपके पास आज {} प्रश्न बचे हैं]", remaining),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn unrecognized_language_renders_hindi_career_template() {
        let prompt = career_prompt("BSc Physics", None, None, Language::from_tag(None));
        assert!(prompt.contains("करियर गाइड"));
        assert!(prompt.contains("BSc Physics"));

        let prompt = career_prompt("BSc Physics", None, None, Language::from_tag(Some("en")));
        assert!(prompt.contains("करियर गाइड"));
    }

    #[test]
    fn blank_optional_fields_leave_no_dangling_punctuation() {
        let prompt = career_prompt("MSc Statistics", Some("   "), Some(""), Language::English);
        assert!(!prompt.contains("with interest in"));
        assert!(!prompt.contains("focusing on"));

        let prompt = career_prompt("MSc Statistics", Some("   "), None, Language::Hindi);
        assert!(!prompt.contains("रुचि:"));
    }

    #[test]
    fn present_optional_fields_are_appended() {
        let prompt = career_prompt(
            "BSc Computer Science",
            Some("robotics"),
            Some("AI"),
            Language::English,
        );
        assert!(prompt.contains("with interest in robotics"));
        assert!(prompt.contains("focusing on AI"));
    }

    #[test]
    fn career_template_keeps_its_five_sections() {
        for language in [Language::English, Language::Hindi] {
            let prompt = career_prompt("B.Tech", None, None, language);
            for marker in ["1)", "2)", "3)", "4)", "5)", "250"] {
                assert!(prompt.contains(marker), "missing {} in {}", marker, prompt);
            }
        }
    }

    #[test]
    fn chat_register_follows_age() {
        let child = chat_prompt("Why is the sky blue", Language::English, Some(8));
        assert!(child.contains("8-year-old"));

        let adult = chat_prompt("Why is the sky blue", Language::English, Some(30));
        assert!(adult.contains("adult learner"));

        let unknown = chat_prompt("Why is the sky blue", Language::English, None);
        assert!(unknown.contains("simple and easy to follow"));
    }

    #[test]
    fn hindi_chat_prompt_requests_devanagari() {
        let prompt = chat_prompt("प्रकाश क्या है", Language::Hindi, None);
        assert!(prompt.contains("देवनागरी"));
    }

    #[test]
    fn jobs_prompt_spells_out_the_json_contract() {
        let request = JobsRequest {
            qualification: "B.Tech".to_string(),
            field_of_study: "Civil Engineering".to_string(),
            age: 23,
            location: "Pune".to_string(),
            job_type: "Full time".to_string(),
        };
        let prompt = government_jobs_prompt(&request);
        for field in [
            "job_title",
            "department_organization",
            "qualification_required",
            "last_date_to_apply",
            "application_link",
            "location",
        ] {
            assert!(prompt.contains(field));
        }
        assert!(prompt.contains("Civil Engineering"));
    }

    #[test]
    fn fallback_message_never_trips_the_corruption_check() {
        let message = default_history_message(date(2025, 8, 15));
        assert!(!message.contains('?'));
        assert!(message.contains("15 अगस्त 2025"));
    }

    #[test]
    fn history_prompt_uses_hindi_month_names() {
        let prompt = daily_history_prompt(date(2025, 1, 26));
        assert!(prompt.contains("26 जनवरी"));
    }

    #[test]
    fn quota_notice_is_localized() {
        assert_eq!(
            low_quota_notice(1, Language::English),
            "\n\n[You have 1 questions remaining today]"
        );
        assert!(low_quota_notice(2, Language::Hindi).contains("2 प्रश्न"));
    }
}
