//! Static ISO-3166 alpha-2 lookup table.
//!
//! Generated once from a representative set of country codes spanning every
//! continent (plus the North/South America split the original country
//! database exposes via UN sub-region). Compiled in, no runtime dependency on
//! an external geo database.

/// `(alpha-2, continent, short English name)`
pub(crate) const COUNTRIES: &[(&str, &str, &str)] = &[
    // Europe
    ("AD", "Europe", "Andorra"),
    ("AL", "Europe", "Albania"),
    ("AT", "Europe", "Austria"),
    ("BA", "Europe", "Bosnia and Herzegovina"),
    ("BE", "Europe", "Belgium"),
    ("BG", "Europe", "Bulgaria"),
    ("BY", "Europe", "Belarus"),
    ("CH", "Europe", "Switzerland"),
    ("CY", "Europe", "Cyprus"),
    ("CZ", "Europe", "Czechia"),
    ("DE", "Europe", "Germany"),
    ("DK", "Europe", "Denmark"),
    ("EE", "Europe", "Estonia"),
    ("ES", "Europe", "Spain"),
    ("FI", "Europe", "Finland"),
    ("FR", "Europe", "France"),
    ("GB", "Europe", "United Kingdom"),
    ("GR", "Europe", "Greece"),
    ("HR", "Europe", "Croatia"),
    ("HU", "Europe", "Hungary"),
    ("IE", "Europe", "Ireland"),
    ("IS", "Europe", "Iceland"),
    ("IT", "Europe", "Italy"),
    ("LI", "Europe", "Liechtenstein"),
    ("LT", "Europe", "Lithuania"),
    ("LU", "Europe", "Luxembourg"),
    ("LV", "Europe", "Latvia"),
    ("MC", "Europe", "Monaco"),
    ("MD", "Europe", "Moldova"),
    ("ME", "Europe", "Montenegro"),
    ("MK", "Europe", "North Macedonia"),
    ("MT", "Europe", "Malta"),
    ("NL", "Europe", "Netherlands"),
    ("NO", "Europe", "Norway"),
    ("PL", "Europe", "Poland"),
    ("PT", "Europe", "Portugal"),
    ("RO", "Europe", "Romania"),
    ("RS", "Europe", "Serbia"),
    ("RU", "Europe", "Russia"),
    ("SE", "Europe", "Sweden"),
    ("SI", "Europe", "Slovenia"),
    ("SK", "Europe", "Slovakia"),
    ("SM", "Europe", "San Marino"),
    ("UA", "Europe", "Ukraine"),
    ("VA", "Europe", "Vatican City"),
    // Asia
    ("AE", "Asia", "United Arab Emirates"),
    ("AF", "Asia", "Afghanistan"),
    ("AM", "Asia", "Armenia"),
    ("AZ", "Asia", "Azerbaijan"),
    ("BD", "Asia", "Bangladesh"),
    ("BH", "Asia", "Bahrain"),
    ("BN", "Asia", "Brunei"),
    ("BT", "Asia", "Bhutan"),
    ("CN", "Asia", "China"),
    ("GE", "Asia", "Georgia"),
    ("HK", "Asia", "Hong Kong"),
    ("ID", "Asia", "Indonesia"),
    ("IL", "Asia", "Israel"),
    ("IN", "Asia", "India"),
    ("IQ", "Asia", "Iraq"),
    ("IR", "Asia", "Iran"),
    ("JO", "Asia", "Jordan"),
    ("JP", "Asia", "Japan"),
    ("KG", "Asia", "Kyrgyzstan"),
    ("KH", "Asia", "Cambodia"),
    ("KP", "Asia", "North Korea"),
    ("KR", "Asia", "South Korea"),
    ("KW", "Asia", "Kuwait"),
    ("KZ", "Asia", "Kazakhstan"),
    ("LA", "Asia", "Laos"),
    ("LB", "Asia", "Lebanon"),
    ("LK", "Asia", "Sri Lanka"),
    ("MM", "Asia", "Myanmar"),
    ("MN", "Asia", "Mongolia"),
    ("MO", "Asia", "Macao"),
    ("MV", "Asia", "Maldives"),
    ("MY", "Asia", "Malaysia"),
    ("NP", "Asia", "Nepal"),
    ("OM", "Asia", "Oman"),
    ("PH", "Asia", "Philippines"),
    ("PK", "Asia", "Pakistan"),
    ("PS", "Asia", "Palestine"),
    ("QA", "Asia", "Qatar"),
    ("SA", "Asia", "Saudi Arabia"),
    ("SG", "Asia", "Singapore"),
    ("SY", "Asia", "Syria"),
    ("TH", "Asia", "Thailand"),
    ("TJ", "Asia", "Tajikistan"),
    ("TM", "Asia", "Turkmenistan"),
    ("TR", "Asia", "Turkey"),
    ("TW", "Asia", "Taiwan"),
    ("UZ", "Asia", "Uzbekistan"),
    ("VN", "Asia", "Vietnam"),
    ("YE", "Asia", "Yemen"),
    // Africa
    ("AO", "Africa", "Angola"),
    ("BF", "Africa", "Burkina Faso"),
    ("BI", "Africa", "Burundi"),
    ("BJ", "Africa", "Benin"),
    ("BW", "Africa", "Botswana"),
    ("CD", "Africa", "DR Congo"),
    ("CF", "Africa", "Central African Republic"),
    ("CG", "Africa", "Congo"),
    ("CI", "Africa", "Ivory Coast"),
    ("CM", "Africa", "Cameroon"),
    ("CV", "Africa", "Cabo Verde"),
    ("DJ", "Africa", "Djibouti"),
    ("DZ", "Africa", "Algeria"),
    ("EG", "Africa", "Egypt"),
    ("ER", "Africa", "Eritrea"),
    ("ET", "Africa", "Ethiopia"),
    ("GA", "Africa", "Gabon"),
    ("GH", "Africa", "Ghana"),
    ("GM", "Africa", "Gambia"),
    ("GN", "Africa", "Guinea"),
    ("GQ", "Africa", "Equatorial Guinea"),
    ("GW", "Africa", "Guinea-Bissau"),
    ("KE", "Africa", "Kenya"),
    ("KM", "Africa", "Comoros"),
    ("LR", "Africa", "Liberia"),
    ("LS", "Africa", "Lesotho"),
    ("LY", "Africa", "Libya"),
    ("MA", "Africa", "Morocco"),
    ("MG", "Africa", "Madagascar"),
    ("ML", "Africa", "Mali"),
    ("MR", "Africa", "Mauritania"),
    ("MU", "Africa", "Mauritius"),
    ("MW", "Africa", "Malawi"),
    ("MZ", "Africa", "Mozambique"),
    ("NA", "Africa", "Namibia"),
    ("NE", "Africa", "Niger"),
    ("NG", "Africa", "Nigeria"),
    ("RW", "Africa", "Rwanda"),
    ("SC", "Africa", "Seychelles"),
    ("SD", "Africa", "Sudan"),
    ("SL", "Africa", "Sierra Leone"),
    ("SN", "Africa", "Senegal"),
    ("SO", "Africa", "Somalia"),
    ("SS", "Africa", "South Sudan"),
    ("ST", "Africa", "Sao Tome and Principe"),
    ("SZ", "Africa", "Eswatini"),
    ("TD", "Africa", "Chad"),
    ("TG", "Africa", "Togo"),
    ("TN", "Africa", "Tunisia"),
    ("TZ", "Africa", "Tanzania"),
    ("UG", "Africa", "Uganda"),
    ("ZA", "Africa", "South Africa"),
    ("ZM", "Africa", "Zambia"),
    ("ZW", "Africa", "Zimbabwe"),
    // North America (includes Central America + Caribbean, per UN sub-region)
    ("AG", "North America", "Antigua and Barbuda"),
    ("BB", "North America", "Barbados"),
    ("BS", "North America", "Bahamas"),
    ("BZ", "North America", "Belize"),
    ("CA", "North America", "Canada"),
    ("CR", "North America", "Costa Rica"),
    ("CU", "North America", "Cuba"),
    ("DM", "North America", "Dominica"),
    ("DO", "North America", "Dominican Republic"),
    ("GD", "North America", "Grenada"),
    ("GT", "North America", "Guatemala"),
    ("HN", "North America", "Honduras"),
    ("HT", "North America", "Haiti"),
    ("JM", "North America", "Jamaica"),
    ("KN", "North America", "Saint Kitts and Nevis"),
    ("LC", "North America", "Saint Lucia"),
    ("MX", "North America", "Mexico"),
    ("NI", "North America", "Nicaragua"),
    ("PA", "North America", "Panama"),
    ("PR", "North America", "Puerto Rico"),
    ("SV", "North America", "El Salvador"),
    ("TT", "North America", "Trinidad and Tobago"),
    ("US", "North America", "United States"),
    ("VC", "North America", "Saint Vincent and the Grenadines"),
    // South America
    ("AR", "South America", "Argentina"),
    ("BO", "South America", "Bolivia"),
    ("BR", "South America", "Brazil"),
    ("CL", "South America", "Chile"),
    ("CO", "South America", "Colombia"),
    ("EC", "South America", "Ecuador"),
    ("GY", "South America", "Guyana"),
    ("PE", "South America", "Peru"),
    ("PY", "South America", "Paraguay"),
    ("SR", "South America", "Suriname"),
    ("UY", "South America", "Uruguay"),
    ("VE", "South America", "Venezuela"),
    // Oceania
    ("AU", "Oceania", "Australia"),
    ("FJ", "Oceania", "Fiji"),
    ("FM", "Oceania", "Micronesia"),
    ("KI", "Oceania", "Kiribati"),
    ("MH", "Oceania", "Marshall Islands"),
    ("NR", "Oceania", "Nauru"),
    ("NZ", "Oceania", "New Zealand"),
    ("PG", "Oceania", "Papua New Guinea"),
    ("PW", "Oceania", "Palau"),
    ("SB", "Oceania", "Solomon Islands"),
    ("TO", "Oceania", "Tonga"),
    ("TV", "Oceania", "Tuvalu"),
    ("VU", "Oceania", "Vanuatu"),
    ("WS", "Oceania", "Samoa"),
    // Antarctica
    ("AQ", "Antarctica", "Antarctica"),
];
