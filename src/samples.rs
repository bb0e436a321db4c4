//! Built-in sample events shown when a run produces nothing.

use crate::models::{DisasterCategory, DisasterEvent};
use chrono::NaiveDate;

struct Sample {
    id: &'static str,
    title: &'static str,
    source_name: &'static str,
    source_url: &'static str,
    occurred_on: (i32, u32, u32),
    category: DisasterCategory,
    location: &'static str,
    damage_summary: &'static str,
    narrative: &'static str,
    is_officially_verified: bool,
    confirming_agency: &'static str,
}

const SAMPLES: &[Sample] = &[
    Sample {
        id: "1",
        title: "43 người chết, thiệt hại hơn 3.000 tỷ đồng do mưa lũ",
        source_name: "VnExpress",
        source_url: "https://vnexpress.net/mua-lu-mien-trung-2025-4789123.html",
        occurred_on: (2025, 11, 21),
        category: DisasterCategory::Flood,
        location: "Nam Trung Bộ (Khánh Hòa, Gia Lai)",
        damage_summary: "43 chết, 9 mất tích, 3000 tỷ đồng",
        narrative: "Mưa lũ lịch sử gây thiệt hại nghiêm trọng tại các tỉnh Nam Trung Bộ.",
        is_officially_verified: true,
        confirming_agency: "Cục QL Đê điều & PCTT",
    },
    Sample {
        id: "2",
        title: "Lũ dữ tàn phá Nam Trung Bộ, hàng triệu tấm lòng hướng về vùng tâm lũ",
        source_name: "VietNamNet",
        source_url: "https://vietnamnet.vn/lu-lut-nam-trung-bo-2025-abc.html",
        occurred_on: (2025, 11, 24),
        category: DisasterCategory::Flood,
        location: "Nam Trung Bộ",
        damage_summary: "91 chết, 11 mất tích, 13000 tỷ đồng",
        narrative: "Cập nhật tình hình lũ lụt và công tác cứu trợ tại các tỉnh bị ảnh hưởng.",
        is_officially_verified: false,
        confirming_agency: "Tổng hợp địa phương",
    },
    Sample {
        id: "3",
        title: "Lũ quét trôi luôn cả làng, nhưng không thiệt hại về người",
        source_name: "Dân Trí",
        source_url: "https://dantri.com.vn/xa-hoi/lu-quet-nghe-an-2025.htm",
        occurred_on: (2025, 12, 12),
        category: DisasterCategory::Landslide,
        location: "Kỳ Sơn, Nghệ An",
        damage_summary: "200 nhà trôi, 0 người chết",
        narrative: "Phép màu tại xã Mỹ Lý khi sơ tán kịp thời trước khi lũ quét ập đến.",
        is_officially_verified: true,
        confirming_agency: "Sở NN&MT Nghệ An",
    },
    Sample {
        id: "4",
        title: "Động đất mạnh 4,9 độ ở Quảng Ngãi lúc rạng sáng",
        source_name: "Tuổi Trẻ",
        source_url: "https://tuoitre.vn/dong-dat-quang-ngai-2025.htm",
        occurred_on: (2025, 10, 6),
        category: DisasterCategory::Earthquake,
        location: "Kon Plông / Quảng Ngãi",
        damage_summary: "Chưa ghi nhận thiệt hại",
        narrative: "Rung chấn mạnh 4.9 độ richter, cảm nhận rõ tại các tỉnh lân cận.",
        is_officially_verified: true,
        confirming_agency: "Viện Vật lý Địa cầu",
    },
    Sample {
        id: "5",
        title: "Sau mưa lũ, người dân miền Trung khẩn trương ứng phó bão số 15",
        source_name: "Sài Gòn Giải Phóng",
        source_url: "https://sggp.org.vn/bao-so-15-koto-2025.html",
        occurred_on: (2025, 11, 26),
        category: DisasterCategory::Storm,
        location: "Miền Trung",
        damage_summary: "Nguy cơ cao",
        narrative: "Vừa dứt lũ, miền Trung lại chuẩn bị đón bão Koto (bão số 15).",
        is_officially_verified: true,
        confirming_agency: "Trung tâm Dự báo KTTV",
    },
];

/// The fallback collection, most recent first.
pub fn sample_events() -> Vec<DisasterEvent> {
    let mut events: Vec<DisasterEvent> = SAMPLES
        .iter()
        .filter_map(|s| {
            let (y, m, d) = s.occurred_on;
            Some(DisasterEvent {
                id: s.id.to_string(),
                title: s.title.to_string(),
                source_name: s.source_name.to_string(),
                source_url: s.source_url.to_string(),
                occurred_on: NaiveDate::from_ymd_opt(y, m, d)?,
                category: s.category,
                location: s.location.to_string(),
                damage_summary: s.damage_summary.to_string(),
                narrative: s.narrative.to_string(),
                is_officially_verified: s.is_officially_verified,
                confirming_agency: Some(s.confirming_agency.to_string()),
            })
        })
        .collect();
    events.sort_by(|a, b| b.occurred_on.cmp(&a.occurred_on));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::is_article_url;

    #[test]
    fn test_samples_are_complete_and_sorted() {
        let events = sample_events();
        assert_eq!(events.len(), SAMPLES.len());
        assert!(events.windows(2).all(|w| w[0].occurred_on >= w[1].occurred_on));
        assert!(events.iter().all(|e| is_article_url(&e.source_url)));
    }
}
