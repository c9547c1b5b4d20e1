//! Static content served to the map and video pages.
use serde::{Deserialize, Serialize};

/// Results requested per video search.
pub const VIDEO_SEARCH_LIMIT: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Where the map opens: central Beijing.
pub const MAP_CENTER: LatLng = LatLng {
    lat: 39.9042,
    lng: 116.4074,
};
pub const MAP_ZOOM: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct City {
    pub name: &'static str,
    pub slug: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub summary: &'static str,
}

pub const CITIES: &[City] = &[
    City {
        name: "Beijing",
        slug: "beijing",
        latitude: 39.9042,
        longitude: 116.4074,
        summary: "The capital: the Forbidden City, Tiananmen Square, the Temple of Heaven and the Great Wall at Mutianyu and Badaling.",
    },
    City {
        name: "Shanghai",
        slug: "shanghai",
        latitude: 31.2304,
        longitude: 121.4737,
        summary: "The Bund's colonial skyline facing Pudong's towers, Yu Garden and the lanes of the former French Concession.",
    },
    City {
        name: "Xi'an",
        slug: "xian",
        latitude: 34.3416,
        longitude: 108.9398,
        summary: "Start of the Silk Road, home of the Terracotta Army, the intact Ming city wall and the Muslim Quarter food street.",
    },
    City {
        name: "Chengdu",
        slug: "chengdu",
        latitude: 30.5728,
        longitude: 104.0668,
        summary: "Giant pandas at the Research Base, teahouses in People's Park and Sichuan hotpot.",
    },
    City {
        name: "Guilin",
        slug: "guilin",
        latitude: 25.2342,
        longitude: 110.1799,
        summary: "Karst peaks along the Li River cruise to Yangshuo and the Longji rice terraces.",
    },
    City {
        name: "Hangzhou",
        slug: "hangzhou",
        latitude: 30.2741,
        longitude: 120.1551,
        summary: "West Lake, Lingyin Temple and the Longjing tea plantations.",
    },
    City {
        name: "Guangzhou",
        slug: "guangzhou",
        latitude: 23.1291,
        longitude: 113.2644,
        summary: "Cantonese dim sum, Shamian Island and the Canton Tower over the Pearl River.",
    },
    City {
        name: "Zhangjiajie",
        slug: "zhangjiajie",
        latitude: 29.1170,
        longitude: 110.4792,
        summary: "Sandstone pillars of the national forest park and the glass bridge over the Grand Canyon.",
    },
    City {
        name: "Lhasa",
        slug: "lhasa",
        latitude: 29.6520,
        longitude: 91.1721,
        summary: "Potala Palace and Jokhang Temple; a Tibet Travel Permit is required on top of the Chinese visa.",
    },
    City {
        name: "Harbin",
        slug: "harbin",
        latitude: 45.8038,
        longitude: 126.5349,
        summary: "Ice and Snow World each winter, Russian architecture along Central Street.",
    },
];

/// Look a city up by slug or display name, ignoring case.
pub fn find_city(key: &str) -> Option<&'static City> {
    let key = key.trim();
    CITIES
        .iter()
        .find(|city| city.slug.eq_ignore_ascii_case(key) || city.name.eq_ignore_ascii_case(key))
}

/// A video card on the videos page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
}

impl Video {
    /// Card for a YouTube id using the default still frame as thumbnail.
    pub fn from_youtube_id(id: &str, title: &str) -> Self {
        Self {
            id: id.to_owned(),
            title: title.to_owned(),
            thumbnail: format!("https://img.youtube.com/vi/{id}/0.jpg"),
        }
    }
}

/// Curated videos shown before the visitor searches.
pub const DEFAULT_VIDEOS: &[(&str, &str)] = &[
    ("Uuwdv2FZOwU", "Exploring China: Amazing Travel Destinations"),
    ("tpk2mF9AEZo", "Top 10 Must-Visit Places in China"),
    ("NJl5lvkJCd0", "A Beautiful Journey Through China"),
    ("33bZIOLX4do", "Hidden Gems of China: Travel Guide"),
    ("b5FtjD2I8es", "China Adventure: Exploring the Great Wall"),
    ("1aYcFjsEULM", "Amazing Chinese Culture and Travel Spots"),
];

pub fn default_videos() -> Vec<Video> {
    DEFAULT_VIDEOS
        .iter()
        .map(|(id, title)| Video::from_youtube_id(id, title))
        .collect()
}
