//! Fixed prompt templates for the judgment service and generation agents.

use crate::report::{PASS_MARKER, WARN_MARKER};

/// Marker a failing verdict should start with. It is not a classification
/// marker: anything without a pass or warn marker already classifies as fail.
pub const FAIL_MARKER: &str = "❌";

/// Build the prompt asking whether `test_case` satisfies `requirement`.
pub fn build_judgment_prompt(requirement: &str, test_case: &str) -> String {
    let mut prompt = String::with_capacity(512);
    prompt.push_str(&format!("Requirement: {}\n", requirement.trim()));
    prompt.push_str(&format!("Test Case: {}\n\n", test_case.trim()));
    prompt.push_str("Determine if the test case correctly satisfies the requirement.\n");
    prompt.push_str("If not, describe the mismatch and suggest a correction.\n");
    prompt.push_str(&format!(
        "Start your answer with {PASS_MARKER} if it fully satisfies the requirement, \
         {WARN_MARKER} if it only partially does, or {FAIL_MARKER} if it does not.\n"
    ));
    prompt.push_str("Respond in one short paragraph.\n");
    prompt
}

/// Prompt turning a requirements document into structured test cases.
pub fn build_test_case_prompt(requirements_text: &str) -> String {
    let mut prompt = String::with_capacity(requirements_text.len() + 512);
    prompt.push_str("You are a QA test engineer. Read the following software requirements\n");
    prompt.push_str("and produce structured test cases in this format:\n\n");
    prompt.push_str("TestCaseID | Title | Steps | Expected Result\n\n");
    prompt.push_str("Requirements:\n");
    prompt.push_str(requirements_text.trim());
    prompt.push('\n');
    prompt
}

/// Prompt turning a source→target mapping document into SQL scripts.
pub fn build_sql_prompt(mapping_text: &str) -> String {
    let mut prompt = String::with_capacity(mapping_text.len() + 512);
    prompt.push_str("You are a senior data engineer. Based on this mapping document,\n");
    prompt.push_str("generate SQL scripts that transform source data to target schema.\n\n");
    prompt.push_str("Mapping Document:\n");
    prompt.push_str(mapping_text.trim());
    prompt.push_str("\n\n");
    prompt.push_str("Include CREATE TABLE (if needed) and INSERT SELECT statements.\n");
    prompt
}
