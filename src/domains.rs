//! The keyword tables of every property domain of a Nexus deck.

use crate::keywords::*;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A kind of method file referenced from the model entry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Pvt,
    Rock,
    Relperm,
    Water,
    Aquifer,
    Equil,
    Separator,
    Valve,
    Hydraulics,
    Gaslift,
    Options,
    Runcontrol,
    Wells,
    Surface,
}

impl Domain {
    pub const ALL: [Domain; 14] = [
        Domain::Pvt,
        Domain::Rock,
        Domain::Relperm,
        Domain::Water,
        Domain::Aquifer,
        Domain::Equil,
        Domain::Separator,
        Domain::Valve,
        Domain::Hydraulics,
        Domain::Gaslift,
        Domain::Options,
        Domain::Runcontrol,
        Domain::Wells,
        Domain::Surface,
    ];

    /// The word introducing this domain's files in the model entry file.
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Pvt => "PVT",
            Domain::Rock => "ROCK",
            Domain::Relperm => "RELPM",
            Domain::Water => "WATER",
            Domain::Aquifer => "AQUIFER",
            Domain::Equil => "EQUIL",
            Domain::Separator => "SEPARATOR",
            Domain::Valve => "VALVE",
            Domain::Hydraulics => "HYD",
            Domain::Gaslift => "GASLIFT",
            Domain::Options => "OPTIONS",
            Domain::Runcontrol => "RUNCONTROL",
            Domain::Wells => "WELLS",
            Domain::Surface => "SURFACE",
        }
    }

    /// Domains whose entry-file line names a single file without a method number.
    pub fn is_single_file(self) -> bool {
        matches!(self, Domain::Options | Domain::Runcontrol)
    }

    pub fn keyword_table(self) -> &'static KeywordTable {
        match self {
            Domain::Pvt => &PVT,
            Domain::Rock => &ROCK,
            Domain::Relperm => &RELPERM,
            Domain::Water => &WATER,
            Domain::Aquifer => &AQUIFER,
            Domain::Equil => &EQUIL,
            Domain::Separator => &SEPARATOR,
            Domain::Valve => &VALVE,
            Domain::Hydraulics => &HYDRAULICS,
            Domain::Gaslift => &GASLIFT,
            Domain::Options => &OPTIONS,
            Domain::Runcontrol => &RUNCONTROL,
            Domain::Wells => &WELLS,
            Domain::Surface => &SURFACE,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.to_ascii_uppercase();
        let domain = match word.as_str() {
            "HYDRAULICS" => Domain::Hydraulics,
            "RELPERM" => Domain::Relperm,
            _ => *Domain::ALL
                .iter()
                .find(|d| d.as_str() == word)
                .ok_or_else(|| format!("unknown domain '{s}'"))?,
        };
        Ok(domain)
    }
}

impl Serialize for Domain {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Unit system and description lines may open any method file.
macro_rules! keys {
    ($($key:expr),* $(,)?) => {
        &[
            flag("ENGLISH"),
            flag("METRIC"),
            flag("METKG/CM2"),
            flag("METBAR"),
            flag("LAB"),
            array("DESC"),
            $($key),*
        ]
    };
}

pub static PVT: KeywordTable = KeywordTable {
    name: "PVT",
    keys: keys![
        flag("BLACKOIL"),
        flag("GASWATER"),
        flag("WATEROIL"),
        flag("EOS"),
        float("API"),
        float("SPECG"),
        float("DENOIL"),
        float("DENGAS"),
        float("TEMP"),
        int("NCOMP"),
        list("COMPONENTS", &["C1", "C2", "C3", "C4", "C5", "C6", "C7+", "N2", "CO2", "H2S"]),
        table("SATURATED", TableRule::headed()),
        table("OIL", TableRule::headed()),
        table("GAS", TableRule::headed()),
        keyed_tables("UNSATOIL", "PSAT", TableRule::headed()),
        keyed_tables("UNSATGAS", "PDEW", TableRule::headed()),
    ],
    closing: &["ENDPVT"],
};

pub static ROCK: KeywordTable = KeywordTable {
    name: "ROCK",
    keys: keys![
        float("PREF"),
        float("CR"),
        float("KP"),
        flag("REVERSIBLE"),
        flag("IRREVERSIBLE"),
        flag("NOCHK"),
        table("CMT", TableRule::headed()),
        keyed_tables("WIRCT", "SWINIT", TableRule::headed()),
    ],
    closing: &[],
};

const KILLOUGH: &[KeyDef] = &[float("MAXTRAP"), float("EXP"), flag("NOMOD")];

const KR_HYSTERESIS: &[KeyDef] = &[
    flag("LINEAR"),
    flag("CARLSON"),
    options("KILLOUGH", KILLOUGH),
    flag("USER"),
    float("MAXTRAP"),
    float("EXP"),
    flag("NOMOD"),
];

const PC_HYSTERESIS: &[KeyDef] = &[float("MAXSW"), float("MAXSG"), float("ETA"), flag("NOEXTRAP")];

const WAG_HYSTERESIS: &[KeyDef] = &[flag("LAND"), float("C"), float("ALPHA"), float("SGTRAP")];

const HYSTERESIS: &[KeyDef] = &[
    options("KRG", KR_HYSTERESIS),
    options("KRW", KR_HYSTERESIS),
    options("KROW", KR_HYSTERESIS),
    options("PCWO", PC_HYSTERESIS),
    options("PCGO", PC_HYSTERESIS),
    options("WAG", WAG_HYSTERESIS),
    float("TOLREV"),
    float("TOLHYS"),
    flag("NOCHK_HYS"),
    flag("NONE"),
];

const WATINJ: &[KeyDef] = &[
    float("SWL"),
    float("SWR"),
    float("SWU"),
    float("SGL"),
    float("SGR"),
    float("SGU"),
    float("SORW"),
    float("SORG"),
];

pub static RELPERM: KeywordTable = KeywordTable {
    name: "RELPM",
    keys: keys![
        flag("STONE1"),
        flag("STONE2"),
        flag("NOCHK"),
        table("SWT", TableRule::headed()),
        table("SGT", TableRule::headed()),
        table("SLT", TableRule::headed()),
        table("SOT", TableRule::headed()),
        section("HYSTERESIS", HYSTERESIS),
        section("WATINJ", WATINJ),
    ],
    closing: &["GASINJ"],
};

pub static WATER: KeywordTable = KeywordTable {
    name: "WATER",
    keys: keys![
        float("DENW"),
        float("CW"),
        float("BW"),
        float("VISW"),
        float("CVW"),
        float("PREF"),
        float("SALINITY"),
        float("TEMP"),
        table("WATERTABLE", TableRule::headed()),
    ],
    closing: &[],
};

pub static AQUIFER: KeywordTable = KeywordTable {
    name: "AQUIFER",
    keys: keys![
        flag("CARTERTRACY"),
        flag("FETKOVICH"),
        flag("LINFAC"),
        float("VISC"),
        float("CT"),
        float("PORO"),
        float("PERM"),
        float("H"),
        float("RO"),
        float("RE"),
        float("ANGLE"),
        float("PI"),
        float("WEI"),
        float("PAQI"),
        float("DAQI"),
        table("ITDPD", TableRule::positional(&["TD", "PD"])),
    ],
    closing: &[],
};

pub static EQUIL: KeywordTable = KeywordTable {
    name: "EQUIL",
    keys: keys![
        float("PINIT"),
        float("DINIT"),
        float("GOC"),
        float("WOC"),
        float("PCGOC"),
        float("PCWOC"),
        flag("VAITS"),
        flag("NOCHK"),
        list("OVERREAD", &["SW", "SG", "SO", "PRESSURE"]),
        table("PBVD", TableRule::headed()),
        table("RSVD", TableRule::headed()),
    ],
    closing: &[],
};

pub static SEPARATOR: KeywordTable = KeywordTable {
    name: "SEPARATOR",
    keys: keys![
        int("WATERMETHOD"),
        float("PSTD"),
        float("TSTD"),
        table("STAGE", TableRule::key_line()),
    ],
    closing: &[],
};

pub static VALVE: KeywordTable = KeywordTable {
    name: "VALVE",
    keys: keys![
        table("VALVE", TableRule::headed().with_named_rows()),
        table("ICD", TableRule::headed().with_named_rows()),
        table("ICV", TableRule::headed().with_named_rows()),
    ],
    closing: &[],
};

pub static HYDRAULICS: KeywordTable = KeywordTable {
    name: "HYD",
    keys: keys![
        float("DATUM"),
        array("QOIL"),
        array("QLIQ"),
        array("QGAS"),
        array("GOR"),
        array("WCUT"),
        array("OGR"),
        array("WGR"),
        array("ALQ"),
        array("THP"),
        table("IQOIL", TableRule::expanded("BHP", "THP")),
        table("IQLIQ", TableRule::expanded("BHP", "THP")),
        table("IQGAS", TableRule::expanded("BHP", "THP")),
    ],
    closing: &[],
};

pub static GASLIFT: KeywordTable = KeywordTable {
    name: "GASLIFT",
    keys: keys![flag("NOCHK"), table("GLTABLE", TableRule::headed())],
    closing: &[],
};

pub static OPTIONS: KeywordTable = KeywordTable {
    name: "OPTIONS",
    keys: keys![
        float("PSTD"),
        float("TSTD"),
        float("RES_TEMP"),
        flag("NOCHK"),
        table("REGDATA", TableRule::terminated("ENDREGDATA")),
    ],
    closing: &[],
};

const SOLVER: &[KeyDef] = &[
    flag("RESERVOIR"),
    flag("GLOBAL"),
    flag("DIRECT"),
    flag("ITERATIVE"),
    int("MAXIT"),
    flag("NOCUT"),
    flag("CUTOUT"),
];

const DT: &[KeyDef] = &[
    float("AUTO"),
    float("MIN"),
    float("MAX"),
    float("MAXINCREASE"),
];

const GRIDSOLVER: &[KeyDef] = &[
    flag("IMPLICIT_COUPLING"),
    flag("NONE"),
    flag("PRECON_ILU"),
    flag("PRECON_AMG"),
];

const IMPSTAB: &[KeyDef] = &[flag("ON"), flag("OFF"), float("TARGETCOP"), flag("SKIPBT")];

const TOLS: &[KeyDef] = &[float("MASS"), float("VOL"), float("PRES"), float("SAT")];

pub static RUNCONTROL: KeywordTable = KeywordTable {
    name: "RUNCONTROL",
    keys: keys![
        options("SOLVER", SOLVER),
        options("DT", DT),
        options("GRIDSOLVER", GRIDSOLVER),
        options("IMPSTAB", IMPSTAB),
        options("TOLS", TOLS),
        one_of("METHOD", &["IMPES", "IMPLICIT", "IMPLICITMBAL"]),
        int("MAXNEWTONS"),
        array("START"),
    ],
    closing: &["TIME", "STOP"],
};

/// Wells files are read by [`crate::wells`]; the table only fixes their known keywords.
pub static WELLS: KeywordTable = KeywordTable {
    name: "WELLS",
    keys: keys![],
    closing: &[
        "WELLSPEC",
        "WELLMOD",
        "WELLS",
        "ENDWELLS",
        "TIME",
        "CONSTRAINTS",
        "ENDCONSTRAINTS",
        "STOP",
    ],
};

pub static SURFACE: KeywordTable = KeywordTable {
    name: "SURFACE",
    keys: keys![
        table("NODECON", TableRule::terminated("ENDNODECON")),
        table("WELLS", TableRule::terminated("ENDWELLS")),
        table("NODES", TableRule::terminated("ENDNODES")),
    ],
    closing: &["TIME", "CONSTRAINTS", "ENDCONSTRAINTS", "STOP"],
};
