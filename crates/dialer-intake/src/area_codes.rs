//! Static NANP area code → home timezone table.
//!
//! Area codes that straddle a zone boundary map to the zone most of their
//! subscribers live in. Unlisted codes have no timezone, which the calling
//! window treats as unrestricted.

use std::{collections::HashMap, sync::LazyLock};

const EASTERN: &[&str] = &[
  // CT DE DC
  "203", "475", "860", "959", "302", "202",
  // FL (peninsula)
  "239", "305", "321", "352", "386", "407", "561", "656", "689", "727", "754",
  "772", "786", "813", "863", "904", "941", "954",
  // GA
  "229", "404", "470", "478", "678", "706", "762", "770", "912", "943",
  // IN (most of the state)
  "260", "317", "463", "574", "765", "812", "930",
  // KY (east)
  "502", "606", "859",
  // ME MD
  "207", "240", "301", "410", "443", "667",
  // MA
  "339", "351", "413", "508", "617", "774", "781", "857", "978",
  // NH NJ
  "603", "201", "551", "609", "640", "732", "848", "856", "862", "908", "973",
  // NY
  "212", "315", "332", "347", "516", "518", "585", "607", "631", "646", "680",
  "716", "718", "838", "845", "914", "917", "929", "934",
  // NC
  "252", "336", "704", "743", "828", "910", "919", "980", "984",
  // OH
  "216", "220", "234", "283", "326", "330", "380", "419", "440", "513", "567",
  "614", "740", "937",
  // PA
  "215", "223", "267", "272", "412", "445", "484", "570", "582", "610", "717",
  "724", "814", "835", "878",
  // RI SC
  "401", "803", "839", "843", "854", "864",
  // TN (east) VT
  "423", "865", "802",
  // VA WV
  "276", "434", "540", "571", "703", "757", "804", "826", "948", "304", "681",
];

const MICHIGAN: &[&str] = &[
  "231", "248", "269", "313", "517", "586", "616", "734", "810", "906", "947",
  "989",
];

const CENTRAL: &[&str] = &[
  // AL AR
  "205", "251", "256", "334", "659", "938", "327", "479", "501", "870",
  // FL (panhandle) IN (northwest)
  "448", "850", "219",
  // IL
  "217", "224", "309", "312", "331", "447", "464", "618", "630", "708", "730",
  "773", "779", "815", "847", "872",
  // IA KS
  "319", "515", "563", "641", "712", "316", "620", "785", "913",
  // KY (west) LA
  "270", "364", "225", "318", "337", "504", "985",
  // MN MS
  "218", "320", "507", "612", "651", "763", "952", "228", "601", "662", "769",
  // MO
  "314", "417", "557", "573", "636", "660", "816", "975",
  // NE ND OK SD
  "308", "402", "531", "701", "405", "539", "572", "580", "918", "605",
  // TN (middle and west)
  "615", "629", "731", "901", "931",
  // TX
  "210", "214", "254", "281", "325", "346", "361", "409", "430", "432", "469",
  "512", "682", "713", "726", "737", "806", "817", "830", "832", "903", "936",
  "940", "945", "956", "972", "979",
  // WI
  "262", "274", "414", "534", "608", "715", "920",
];

const MOUNTAIN: &[&str] = &[
  "303", "719", "720", "970", "983", "208", "986", "406", "505", "575", "385",
  "435", "801", "307", "915",
];

const ARIZONA: &[&str] = &["480", "520", "602", "623", "928"];

const PACIFIC: &[&str] = &[
  // CA
  "209", "213", "279", "310", "323", "341", "350", "408", "415", "424", "442",
  "510", "530", "559", "562", "619", "626", "628", "650", "657", "661", "669",
  "707", "714", "747", "760", "805", "818", "820", "831", "840", "858", "909",
  "916", "925", "949", "951",
  // NV OR WA
  "702", "725", "775", "458", "503", "541", "971", "206", "253", "360", "425",
  "509", "564",
];

const ZONES: &[(&str, &[&str])] = &[
  ("America/New_York", EASTERN),
  ("America/Detroit", MICHIGAN),
  ("America/Chicago", CENTRAL),
  ("America/Denver", MOUNTAIN),
  ("America/Phoenix", ARIZONA),
  ("America/Los_Angeles", PACIFIC),
  ("America/Anchorage", &["907"]),
  ("Pacific/Honolulu", &["808"]),
  ("America/Puerto_Rico", &["787", "939"]),
  ("America/Toronto", &[
    "226", "249", "263", "289", "343", "354", "365", "367", "416", "418", "437",
    "438", "450", "514", "519", "548", "579", "581", "613", "647", "705", "807",
    "819", "873", "905",
  ]),
  ("America/Winnipeg", &["204", "431", "584"]),
  ("America/Regina", &["306", "474", "639"]),
  ("America/Edmonton", &["368", "403", "587", "780", "825"]),
  ("America/Vancouver", &["236", "250", "604", "672", "778"]),
  ("America/Halifax", &["428", "506", "782", "902"]),
  ("America/St_Johns", &["709", "879"]),
];

static AREA_CODES: LazyLock<HashMap<&'static str, &'static str>> =
  LazyLock::new(|| {
    ZONES
      .iter()
      .flat_map(|(zone, codes)| codes.iter().map(move |code| (*code, *zone)))
      .collect()
  });

/// The IANA timezone subscribers of `area_code` are assumed to live in.
pub fn timezone_for_area_code(area_code: &str) -> Option<&'static str> {
  AREA_CODES.get(area_code).copied()
}
