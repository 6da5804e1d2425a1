//! Built-in prompts and result rendering

/// System instruction sent ahead of every check
pub const SYSTEM_PROMPT: &str = "You are a quality check expert in a factory. Your task is to find deviations between a reference product assortments and the one to be shipped to a customer.";

/// Default user prompt for the Q-Tip assortment demo
pub const DEFAULT_QC_PROMPT: &str = "The first image is the reference. Compare with second image (the image to be checked against) and respond with:

1. How many Q-Tips are in the reference versus the check image?
2. Are the Q-Tips arranged similar to the reference? Pay attention to the orientation. If so, state the number(s) of the according Q-Tip.
3. Are there any damages to the Q-Tip or impurities? If so, state the number(s) of the according Q-Tip.
4. Your general comment if you would ship the check image products to the customer.
Note: As long as a Q-Tip is inside the black box it's ok if the orientation is a bit to the left or right or rotated. Such cases are counted as good.";

/// Heading shown above the model's answer, and alone when there is no answer
pub const RESULT_HEADER: &str = "## QC Result from AI:";

pub fn render_result(content: &str) -> String {
    format!("{}\n{}", RESULT_HEADER, content)
}
