//! Extraction prompt assembly.
//!
//! Each article becomes one block tagged with its 0-based position in the
//! run's article list. The model is told to echo that position in the `id`
//! field of every record it emits; the reconciler joins on it. The prompter
//! does no validation of the answer.

use crate::api::{AskAsync, StructuredPrompt};
use crate::error::ServiceError;
use crate::fetcher::truncate_body;
use crate::models::{DisasterCategory, FetchedArticle};
use serde_json::{Value, json};
use std::fmt::Write;
use tracing::{info, instrument};

const UNKNOWN_DATE: &str = "Không rõ";

/// Instruction block placed before the article data.
const INSTRUCTIONS: &str = "\
Dưới đây là nội dung các bài báo tiếng Việt, mỗi bài được đánh dấu bằng [INDEX n].
Nhiệm vụ: trích xuất danh sách JSON các sự kiện thiên tai tại Việt Nam.

Quy tắc:
1. Chỉ chọn tin về thiên tai: bão, áp thấp nhiệt đới, lũ lụt, lũ quét, sạt lở đất, động đất, hạn hán, xâm nhập mặn.
2. Bỏ qua tin dự báo thời tiết thông thường, trừ khi là cảnh báo bão khẩn cấp.
3. Trường \"id\" PHẢI là đúng số nguyên n của [INDEX n] của bài báo chứa sự kiện. Không tự đặt số mới.
4. Ngày tháng theo định dạng YYYY-MM-DD.
5. \"category\" là một trong: FLOOD, STORM, LANDSLIDE, EARTHQUAKE, DROUGHT, OTHER.
6. Giữ nguyên số liệu thiệt hại (người chết, mất tích, nhà sập, tỷ đồng) như trong bài.
7. \"narrative\" tóm tắt dưới 30 từ.
8. \"isOfficiallyVerified\" là true nếu bài trích dẫn cơ quan chức năng; ghi tên cơ quan vào \"confirmingAgency\".
9. Nếu không có bài nào phù hợp, trả về mảng rỗng [].
10. Chỉ trả về dữ liệu JSON, không giải thích, không thêm lời dẫn.";

/// JSON schema for the model's answer: an array of extraction records.
pub fn extraction_schema() -> Value {
    let categories: Vec<&str> = DisasterCategory::ALL.iter().map(|c| c.code()).collect();
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "INTEGER", "description": "n of the [INDEX n] block the event came from" },
                "title": { "type": "STRING" },
                "sourceName": { "type": "STRING", "description": "Newspaper name" },
                "occurredOn": { "type": "STRING", "description": "YYYY-MM-DD" },
                "category": { "type": "STRING", "enum": categories },
                "location": { "type": "STRING" },
                "damageSummary": { "type": "STRING" },
                "narrative": { "type": "STRING" },
                "isOfficiallyVerified": { "type": "BOOLEAN" },
                "confirmingAgency": { "type": "STRING" }
            },
            "required": ["id"]
        }
    })
}

/// One text block per article, tagged with its position.
pub fn build_context(articles: &[FetchedArticle], body_char_budget: usize) -> String {
    let mut context = String::new();
    for (index, article) in articles.iter().enumerate() {
        // Writing to a String cannot fail.
        let _ = write!(
            context,
            "[INDEX {index}]\nTiêu đề: {title}\nNgày đăng: {date}\nNội dung:\n{body}\n\n",
            title = article.title,
            date = article.published_date.as_deref().unwrap_or(UNKNOWN_DATE),
            body = truncate_body(&article.body_text, body_char_budget),
        );
    }
    context
}

/// The full prompt for `articles`.
pub fn build_prompt(articles: &[FetchedArticle], body_char_budget: usize) -> StructuredPrompt {
    StructuredPrompt {
        text: format!(
            "{}\n\nDữ liệu đầu vào:\n\n{}",
            INSTRUCTIONS,
            build_context(articles, body_char_budget)
        ),
        schema: extraction_schema(),
    }
}

/// Ask the model to extract events from `articles`; returns its raw text.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub async fn extract<L: AskAsync>(
    llm: &L,
    articles: &[FetchedArticle],
    body_char_budget: usize,
) -> Result<String, ServiceError> {
    let prompt = build_prompt(articles, body_char_budget);
    info!(prompt_chars = prompt.text.chars().count(), "Sending extraction request");
    llm.ask(&prompt).await
}
