//! Parser tests against saved masothue.com page shapes

mod common;

use chrono::NaiveDate;
use masothue::models::CompanyStatus;
use masothue::parser::{parse_detail_html, parse_search_html, parse_search_page, SearchPage};
use masothue::utils::error::ParseError;
use scraper::Html;

use common::{DETAIL_HTML, EMPTY_SEARCH_HTML, SEARCH_HTML};

const DETAIL_URL: &str = "https://masothue.com/3604062974-cong-ty-tnhh-abc";
const SEARCH_URL: &str = "https://masothue.com/Search/?q=abc&type=auto";

#[test]
fn test_parse_detail_fields() {
    let record = parse_detail_html(DETAIL_HTML, DETAIL_URL).unwrap();

    assert_eq!(record.tax_id.as_ref().unwrap().as_str(), "3604062974");
    assert_eq!(record.name.as_deref(), Some("CÔNG TY TNHH ABC"));
    assert_eq!(
        record.tax_address.as_deref(),
        Some("Số 12, Đường 3A, KCN Biên Hòa II, Đồng Nai")
    );
    assert_eq!(
        record.address.as_deref(),
        Some("Số 12 Đường 3A, Phường An Bình, TP Biên Hòa, Đồng Nai")
    );
    assert_eq!(record.representative.as_deref(), Some("NGUYỄN VĂN A"));
    assert_eq!(record.status, CompanyStatus::Active);
    assert_eq!(
        record.activity_start_date,
        NaiveDate::from_ymd_opt(2008, 7, 15)
    );
    assert_eq!(record.managing_authority.as_deref(), Some("Cục Thuế Tỉnh Đồng Nai"));
    assert_eq!(
        record.entity_type.as_deref(),
        Some("Công ty trách nhiệm hữu hạn ngoài NN")
    );
    assert_eq!(record.detail_reference.as_deref(), Some(DETAIL_URL));
    assert!(!record.is_partial());
}

#[test]
fn test_hidden_phone_is_blank_not_absent() {
    let record = parse_detail_html(DETAIL_HTML, DETAIL_URL).unwrap();
    assert_eq!(record.phone.as_deref(), Some(""));
}

#[test]
fn test_business_lines_and_primary_fallback() {
    let record = parse_detail_html(DETAIL_HTML, DETAIL_URL).unwrap();

    assert_eq!(
        record.other_business_lines,
        Some(vec![
            "4610 - Đại lý, môi giới, đấu giá".to_string(),
            "2511 - Sản xuất các cấu kiện kim loại".to_string(),
        ])
    );
    assert_eq!(
        record.primary_business.as_deref(),
        Some("Sản xuất các cấu kiện kim loại")
    );
}

#[test]
fn test_label_fallback_without_semantic_hooks() {
    let html = r#"<html><body>
        <h1>0312345678 - CÔNG TY CỔ PHẦN XYZ</h1>
        <ul>
          <li>Mã số thuế: 0312345678</li>
          <li>Tình trạng: Ngừng hoạt động và đã đóng MST</li>
          <li>Ngày hoạt động: 01/02/2015</li>
        </ul>
    </body></html>"#;

    let record = parse_detail_html(html, "https://masothue.com/0312345678-xyz").unwrap();

    assert_eq!(record.tax_id.as_ref().unwrap().as_str(), "0312345678");
    assert_eq!(record.name.as_deref(), Some("CÔNG TY CỔ PHẦN XYZ"));
    assert_eq!(record.status, CompanyStatus::Inactive);
    assert_eq!(record.activity_start_date, NaiveDate::from_ymd_opt(2015, 2, 1));
    assert_eq!(record.address, None);
    assert_eq!(record.other_business_lines, None);
}

#[test]
fn test_unrecognized_detail_page() {
    let html = "<html><body><h1>Trang chủ</h1><p>Tra cứu mã số thuế</p></body></html>";
    let err = parse_detail_html(html, "https://masothue.com/").unwrap_err();
    assert!(matches!(err, ParseError::UnrecognizedPage { .. }));
}

#[test]
fn test_parse_search_listing_in_document_order() {
    let hits = parse_search_html(SEARCH_HTML, SEARCH_URL);

    assert_eq!(hits.len(), 2);

    assert_eq!(hits[0].tax_id.as_ref().unwrap().as_str(), "0100109106");
    assert_eq!(
        hits[0].name.as_deref(),
        Some("TẬP ĐOÀN CÔNG NGHIỆP - VIỄN THÔNG QUÂN ĐỘI")
    );
    assert_eq!(hits[0].representative.as_deref(), Some("TÀO ĐỨC THẮNG"));

    assert_eq!(hits[1].tax_id.as_ref().unwrap().as_str(), "3604062974");
    assert_eq!(
        hits[1].reference.as_deref(),
        Some("https://masothue.com/3604062974-cong-ty-tnhh-abc")
    );
    assert_eq!(
        hits[1].address.as_deref(),
        Some("Số 12 Đường 3A, Phường An Bình, TP Biên Hòa, Đồng Nai")
    );
}

#[test]
fn test_parse_search_empty() {
    assert!(parse_search_html(EMPTY_SEARCH_HTML, SEARCH_URL).is_empty());
}

#[test]
fn test_search_redirected_to_company_page() {
    let document = Html::parse_document(DETAIL_HTML);

    match parse_search_page(&document, DETAIL_URL) {
        SearchPage::Company(record) => {
            assert_eq!(record.tax_id.as_ref().unwrap().as_str(), "3604062974");
        }
        SearchPage::Results(hits) => panic!("expected company page, got {} hits", hits.len()),
    }

    let hits = parse_search_html(DETAIL_HTML, DETAIL_URL);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].reference.as_deref(), Some(DETAIL_URL));
    assert_eq!(
        hits[0].address.as_deref(),
        Some("Số 12, Đường 3A, KCN Biên Hòa II, Đồng Nai")
    );
}

/// Info-table rows without semantic hooks: the representative cell lists
/// other companies and the phone cell carries a prefix and an extension
#[test]
fn test_table_rows_without_hooks_are_cleaned() {
    let html = r#"<html><body>
        <table class="table-taxinfo"><tbody>
          <tr><td>Mã số thuế</td><td>3604062974</td></tr>
          <tr><td>Người đại diện</td><td>
            <a href="/Search/?q=NGUYEN+VAN+A">NGUYỄN VĂN A</a><br>
            Ngoài ra NGUYỄN VĂN A còn đại diện các doanh nghiệp: CÔNG TY X
          </td></tr>
          <tr><td>Điện thoại</td><td>Tel: 0251 3836 (ext. 12)</td></tr>
        </tbody></table>
    </body></html>"#;

    let record = parse_detail_html(html, DETAIL_URL).unwrap();

    assert_eq!(record.tax_id.as_ref().unwrap().as_str(), "3604062974");
    assert_eq!(record.representative.as_deref(), Some("NGUYỄN VĂN A"));
    assert_eq!(record.phone.as_deref(), Some("0251 3836 ( 12)"));
}

#[test]
fn test_representative_label_text_is_discarded() {
    let html = r#"<html><body>
        <table class="table-taxinfo"><tbody>
          <tr><td>Mã số thuế</td><td>3604062974</td></tr>
          <tr><td>Người đại diện</td><td>Mã số thuế: 3604062974</td></tr>
        </tbody></table>
    </body></html>"#;

    let record = parse_detail_html(html, DETAIL_URL).unwrap();
    assert_eq!(record.representative, None);
}

/// A labelled company name is enough to accept the page as a partial record
#[test]
fn test_labelled_name_identifies_company_page() {
    let html = r#"<html><body><ul>
        <li>Tên công ty: CÔNG TY TNHH ABC</li>
        <li>Tình trạng: Đang hoạt động</li>
    </ul></body></html>"#;

    let record = parse_detail_html(html, "https://masothue.com/x").unwrap();

    assert_eq!(record.name.as_deref(), Some("CÔNG TY TNHH ABC"));
    assert_eq!(record.tax_id, None);
    assert_eq!(record.status, CompanyStatus::Active);
    assert!(record.is_partial());
}
