use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HelpStep {
    pub number: u8,
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaqEntry {
    pub question: &'static str,
    pub answer: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpContent {
    pub getting_started: Vec<HelpStep>,
    pub accessibility: &'static str,
    pub faq: Vec<FaqEntry>,
}

const STEPS: &[(&str, &str)] = &[
    (
        "Select Your Apps",
        "Add the apps you want to cycle through from the home screen.",
    ),
    (
        "Enable Accessibility Service",
        "Grant App Cycler permission to detect when the 'Mode' button is pressed.",
    ),
    (
        "Set App Cycler as Default",
        "In your head unit settings, set App Cycler as the default navigation app.",
    ),
    (
        "Test It Out",
        "Press the 'Mode' button on your steering wheel to cycle through your apps.",
    ),
];

const FAQ: &[(&str, &str)] = &[
    (
        "Will this work with any car stereo?",
        "App Cycler works with Android-based head units that support application switching via SWC mode button.",
    ),
    (
        "Does it require root access?",
        "No, App Cycler uses Android's accessibility service which doesn't require root access.",
    ),
    (
        "What if an app isn't showing in the list?",
        "Only apps that are launchable will appear in the list. System apps may not be available.",
    ),
    (
        "Will this drain my battery?",
        "App Cycler uses minimal resources and only activates when the mode button is pressed.",
    ),
];

pub fn help_content() -> HelpContent {
    HelpContent {
        getting_started: STEPS
            .iter()
            .zip(1u8..)
            .map(|(&(title, description), number)| HelpStep {
                number,
                title,
                description,
            })
            .collect(),
        accessibility: "The accessibility service only monitors for button presses from your \
                        steering wheel controls. It does not collect any personal data or monitor \
                        your other activities.",
        faq: FAQ
            .iter()
            .map(|&(question, answer)| FaqEntry { question, answer })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_numbered_from_one() {
        let content = help_content();
        let numbers: Vec<_> = content.getting_started.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(content.faq.len(), 4);
    }
}
