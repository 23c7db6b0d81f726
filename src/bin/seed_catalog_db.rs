// ==========================================
// 产品目录门户 - 演示数据库初始化
// ==========================================
// 用法: seed_catalog_db [db_path]
// 内容: 5 个品类元数据 + 示例产品（经导入管道写入）+ 文章与下载文件
// 说明: 已存在的数据库先备份再重建
// ==========================================

use chrono::{Local, Utc};
use std::error::Error;
use std::fs;
use std::path::Path;

use catalog_portal::app::{get_default_db_path, AppState};
use catalog_portal::db::{ensure_core_schema, open_sqlite_connection};
use catalog_portal::domain::{
    Article, CategoryDescriptor, ColumnDescriptor, DownloadFile, FilterDescriptor, FilterDomain,
    FilterOption,
};
use catalog_portal::repository::MetadataRepository;
use catalog_portal::ColumnDataType;
use std::sync::{Arc, Mutex};

fn main() -> Result<(), Box<dyn Error>> {
    catalog_portal::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    backup_and_reset_db(&db_path)?;

    // 元数据先于 AppState 写入，保证启动时即可加载全部品类
    {
        let conn = open_sqlite_connection(&db_path)?;
        ensure_core_schema(&conn)?;
        let metadata_repo = MetadataRepository::from_connection(Arc::new(Mutex::new(conn)));
        for (sort_order, desc) in demo_categories().iter().enumerate() {
            metadata_repo.upsert_category(desc, sort_order as i32 + 1)?;
        }
    }

    let state = AppState::new(db_path.clone())?;
    seed_content(&state)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        for (category, csv) in demo_products() {
            match state
                .import_api
                .import_csv(category, csv.as_bytes().to_vec())
                .await
            {
                Ok(report) => eprintln!(
                    "{:<12} inserted={} updated={} failed={}",
                    category,
                    report.inserted,
                    report.updated,
                    report.failed_rows()
                ),
                Err(e) => eprintln!("{:<12} 导入失败: {}", category, e),
            }
        }
    });

    eprintln!(
        "Seeded {} categories into {}",
        state.catalog_api.list_categories().len(),
        db_path
    );
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn checkbox(name: &str, label: &str, sort_order: i32, values: &[&str]) -> FilterDescriptor {
    FilterDescriptor {
        name: name.to_string(),
        label: label.to_string(),
        unit: None,
        sort_order,
        default_expanded: sort_order == 1,
        active: true,
        domain: FilterDomain::CheckboxSet {
            options: values
                .iter()
                .map(|v| FilterOption {
                    value: v.to_string(),
                    label: v.to_string(),
                })
                .collect(),
        },
    }
}

fn range(name: &str, label: &str, unit: &str, sort_order: i32, max: f64, step: f64) -> FilterDescriptor {
    FilterDescriptor {
        name: name.to_string(),
        label: label.to_string(),
        unit: Some(unit.to_string()),
        sort_order,
        default_expanded: false,
        active: true,
        domain: FilterDomain::NumericRange {
            min: 0.0,
            max,
            step,
        },
    }
}

fn key() -> ColumnDescriptor {
    ColumnDescriptor::basic("part_number", "Part Number", ColumnDataType::Text, 1)
}

fn name() -> ColumnDescriptor {
    ColumnDescriptor::basic("name", "Name", ColumnDataType::Text, 2)
}

fn demo_categories() -> Vec<CategoryDescriptor> {
    vec![
        CategoryDescriptor::new(
            "camera",
            "Industrial Cameras",
            "camera_products",
            vec![
                key(),
                name(),
                ColumnDescriptor::basic("interface", "Interface", ColumnDataType::Text, 3),
                ColumnDescriptor::basic("resolution_mp", "Resolution", ColumnDataType::Number, 4)
                    .with_unit("MP"),
                ColumnDescriptor::specification("frame_rate", "Frame Rate", ColumnDataType::Number, 5)
                    .with_unit("fps"),
                ColumnDescriptor::specification("color", "Color", ColumnDataType::Boolean, 6),
                ColumnDescriptor::basic("image", "Image", ColumnDataType::ImageReference, 7),
            ],
            vec![
                checkbox("interface", "Interface", 1, &["GigE", "USB3", "CoaXPress"]),
                range("resolution_mp", "Resolution", "MP", 2, 50.0, 0.5),
            ],
        ),
        CategoryDescriptor::new(
            "lens",
            "Lenses",
            "lens_products",
            vec![
                key(),
                name(),
                ColumnDescriptor::basic("mount", "Mount", ColumnDataType::Text, 3),
                ColumnDescriptor::basic("focal_mm", "Focal Length", ColumnDataType::Number, 4)
                    .with_unit("mm"),
                ColumnDescriptor::specification("aperture", "Aperture", ColumnDataType::Number, 5),
            ],
            vec![
                checkbox("mount", "Mount", 1, &["C", "CS", "M12"]),
                range("focal_mm", "Focal Length", "mm", 2, 100.0, 1.0),
            ],
        ),
        CategoryDescriptor::new(
            "controller",
            "Light Controllers",
            "controller_products",
            vec![
                key(),
                name(),
                ColumnDescriptor::basic("channels", "Channels", ColumnDataType::Number, 3),
                ColumnDescriptor::specification("strobe", "Strobe", ColumnDataType::Boolean, 4),
            ],
            vec![checkbox("channels", "Channels", 1, &["1", "2", "4", "8"])],
        ),
        CategoryDescriptor::new(
            "cable",
            "Cables",
            "cable_products",
            vec![
                key(),
                name(),
                ColumnDescriptor::basic("length_mm", "Length", ColumnDataType::Number, 3)
                    .with_unit("mm"),
                ColumnDescriptor::specification("connector", "Connector", ColumnDataType::Text, 4),
            ],
            vec![range("length_mm", "Length", "mm", 1, 20_000.0, 100.0)],
        ),
        CategoryDescriptor::new(
            "light",
            "Lights",
            "light_products",
            vec![
                key(),
                name(),
                ColumnDescriptor::basic("color", "Color", ColumnDataType::Text, 3),
                ColumnDescriptor::specification("wattage", "Wattage", ColumnDataType::Number, 4)
                    .with_unit("W"),
            ],
            vec![checkbox("color", "Color", 1, &["White", "Red", "Blue", "IR"])],
        ),
    ]
}

fn demo_products() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "camera",
            "Part Number,Name,Interface,Resolution,Frame Rate,Color,Image\n\
             CAM-500,Area Scan 5MP,GigE,5,35,true,images/cam-500.png\n\
             CAM-1200,Area Scan 12MP,USB3,12.3,30,false,\n",
        ),
        (
            "lens",
            "Part Number,Name,Mount,Focal Length,Aperture\n\
             LEN-16,Fixed Focal 16mm,C,16,1.8\n\
             LEN-25,Fixed Focal 25mm,C,25,2.0\n",
        ),
        (
            "controller",
            "Part Number,Name,Channels,Strobe\n\
             CTL-4,Four Channel Controller,4,yes\n",
        ),
        (
            "cable",
            "Part Number,Name,Length,Connector\n\
             CBL-001,GigE Cable 5m,5000,RJ45\n\
             CBL-002,USB3 Cable 3m,3000,USB-C\n",
        ),
        (
            "light",
            "Part Number,Name,Color,Wattage\n\
             LGT-RING-W,Ring Light White,White,12\n\
             LGT-BAR-R,Bar Light Red,Red,8\n",
        ),
    ]
}

fn seed_content(state: &AppState) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    let articles = [
        ("a-1", "Choosing a GigE camera", "choosing-gige-camera", "Bandwidth, cabling and PoE considerations."),
        ("a-2", "Lens selection basics", "lens-selection-basics", "Focal length, working distance and sensor size."),
    ];
    for (id, title, slug, excerpt) in articles {
        state.content_repo.upsert_article(&Article {
            id: id.to_string(),
            title: title.to_string(),
            slug: slug.to_string(),
            excerpt: Some(excerpt.to_string()),
            updated_at: now,
        })?;
    }

    let files = [
        ("f-1", "CAM-500 datasheet", "cam-500-datasheet.pdf", "datasheet"),
        ("f-2", "Controller SDK", "controller-sdk.zip", "driver"),
    ];
    for (id, title, filename, collection) in files {
        state.content_repo.upsert_file(&DownloadFile {
            id: id.to_string(),
            title: title.to_string(),
            filename: filename.to_string(),
            collection: Some(collection.to_string()),
            updated_at: now,
        })?;
    }
    Ok(())
}
