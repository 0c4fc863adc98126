//! The seeded reference dataset.

use chrono::NaiveDate;

use super::{District, DistrictRegistry, LocalityCode, Official, OfficialRole};

impl DistrictRegistry {
    /// The built-in reference dataset.
    pub fn reference() -> Self {
        Self::new(reference_districts(), reference_officials())
            .expect("Built-in reference data is well-formed")
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Prefixes `{base}01` through `{base}{count}`.
fn numbered_prefixes(base: &str, count: u32) -> impl Iterator<Item = String> + '_ {
    (1..=count).map(move |n| format!("{base}{n:02}"))
}

/// Districts to seed, in resolution order.
pub fn reference_districts() -> Vec<District> {
    let malang_codes = [
        ("357301", "Klojen"),
        ("357302", "Blimbing"),
        ("357303", "Kedungkandang"),
        ("357304", "Sukun"),
        ("357305", "Lowokwaru"),
    ];

    let jatim_vi = District {
        name: "JAWA TIMUR VI".to_string(),
        description: "Daerah Pemilihan Jawa Timur VI meliputi Kota Malang, Kabupaten Malang, \
                      dan Kota Batu dengan 12 kursi DPR RI"
            .to_string(),
        province: "Jawa Timur".to_string(),
        cities: strings(&["Kota Malang", "Kabupaten Malang", "Kota Batu"]),
        localities: strings(&[
            // Kota Malang
            "Blimbing", "Kedungkandang", "Klojen", "Lowokwaru", "Sukun",
            // Kabupaten Malang
            "Ampelgading", "Bantur", "Bululawang", "Dampit", "Dau", "Donomulyo", "Gedangan",
            "Gondanglegi", "Jabung", "Kalipare", "Karangploso", "Kasembon", "Kepanjen",
            "Kromengan", "Lawang", "Ngajum", "Ngantang", "Pagak", "Pagelaran", "Pakis",
            "Pakisaji", "Poncokusumo", "Pujon", "Singosari", "Sumbermanjing Wetan",
            "Sumberpucung", "Tajinan", "Tirtoyudo", "Tumpang", "Turen", "Wagir", "Wajak",
            "Wonosari",
            // Kota Batu
            "Batu", "Bumiaji", "Junrejo",
        ]),
        nik_prefixes: numbered_prefixes("3573", 5)
            .chain(numbered_prefixes("3507", 33))
            .chain(numbered_prefixes("3579", 3))
            .collect(),
        locality_codes: malang_codes
            .iter()
            .map(|(prefix, locality)| LocalityCode {
                prefix: prefix.to_string(),
                locality: locality.to_string(),
            })
            .collect(),
    };

    let jatim_i = District {
        name: "JAWA TIMUR I".to_string(),
        description: "Daerah Pemilihan Jawa Timur I meliputi Kota Surabaya, Kabupaten Sidoarjo, \
                      dan Kabupaten Gresik"
            .to_string(),
        province: "Jawa Timur".to_string(),
        cities: strings(&["Kota Surabaya", "Kabupaten Sidoarjo", "Kabupaten Gresik"]),
        localities: strings(&[
            // Surabaya
            "Gubeng", "Sukolilo", "Rungkut", "Tenggilis Mejoyo", "Mulyorejo",
            // Sidoarjo
            "Sidoarjo", "Gedangan", "Taman", "Waru", "Buduran",
            // Gresik
            "Gresik", "Kebomas", "Manyar", "Duduksampeyan",
        ]),
        nik_prefixes: numbered_prefixes("3578", 5)
            .chain(numbered_prefixes("3515", 5))
            .chain(numbered_prefixes("3525", 4))
            .collect(),
        locality_codes: Vec::new(),
    };

    vec![jatim_vi, jatim_i]
}

/// Officials to seed.
pub fn reference_officials() -> Vec<Official> {
    fn official(
        name: &str,
        position: &str,
        party: &str,
        role: OfficialRole,
        area: &str,
        period: ((i32, u32, u32), (i32, u32, u32)),
    ) -> Official {
        let ((sy, sm, sd), (ey, em, ed)) = period;
        Official {
            name: name.to_string(),
            position: position.to_string(),
            party: Some(party.to_string()),
            role,
            electoral_district: area.to_string(),
            period_start: NaiveDate::from_ymd_opt(sy, sm, sd),
            period_end: NaiveDate::from_ymd_opt(ey, em, ed),
        }
    }

    use OfficialRole::*;
    let governor = ((2019, 2, 13), (2024, 2, 13));
    let mayor = ((2018, 2, 26), (2023, 2, 26));
    let dpr = ((2019, 10, 1), (2024, 9, 30));
    let dprd = ((2019, 8, 23), (2024, 8, 23));

    vec![
        official("Khofifah Indar Parawansa", "Gubernur Jawa Timur", "PKB", PimpinanDaerah, "Jawa Timur", governor),
        official("Emil Elestianto Dardak", "Wakil Gubernur Jawa Timur", "PKB", PimpinanDaerah, "Jawa Timur", governor),
        official("Drs. H. Sutiaji", "Walikota Malang", "Independen", PimpinanDaerah, "Kota Malang", mayor),
        official("Ir. H. Sofyan Edi Jarwoko", "Wakil Walikota Malang", "Independen", PimpinanDaerah, "Kota Malang", mayor),
        official("Dr. Gamal Albinsaid", "Anggota DPR RI", "PKS", Dpri, "JAWA TIMUR VI", dpr),
        official("Dr. Ahmad Basarah", "Anggota DPR RI", "PDI-P", Dpri, "JAWA TIMUR VI", dpr),
        official("Ir. Andreas Eddy Susetyo", "Anggota DPR RI", "PDI-P", Dpri, "JAWA TIMUR VI", dpr),
        official("H. Moch. Arief Wicaksono", "Ketua DPRD Kota Malang", "PDI-P", Dprd, "Kota Malang", dprd),
        official("H. Didik Gatot Subroto", "Wakil Ketua DPRD Kota Malang", "Golkar", Dprd, "Kota Malang", dprd),
        official("Hj. Yenny Wahyuni", "Wakil Ketua DPRD Kota Malang", "PKB", Dprd, "Kota Malang", dprd),
    ]
}
