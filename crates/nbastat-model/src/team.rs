use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A franchise code as used in basketball-reference.com URLs
/// (e.g. `/teams/BOS/2021.html`).
///
/// The codes follow the site, not the league: Brooklyn is `BRK`,
/// Charlotte is `CHO` and Phoenix is `PHO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TeamCode {
    Bos,
    Atl,
    Brk,
    Cho,
    Chi,
    Cle,
    Dal,
    Den,
    Det,
    Gsw,
    Hou,
    Ind,
    Lac,
    Lal,
    Mem,
    Mia,
    Mil,
    Min,
    Nop,
    Nyk,
    Okc,
    Orl,
    Phi,
    Pho,
    Por,
    Sac,
    Sas,
    Tor,
    Uta,
    Was,
}

impl TeamCode {
    /// Every team, in load order.
    pub const ALL: [TeamCode; 30] = [
        TeamCode::Bos, TeamCode::Atl, TeamCode::Brk, TeamCode::Cho, TeamCode::Chi,
        TeamCode::Cle, TeamCode::Dal, TeamCode::Den, TeamCode::Det, TeamCode::Gsw,
        TeamCode::Hou, TeamCode::Ind, TeamCode::Lac, TeamCode::Lal, TeamCode::Mem,
        TeamCode::Mia, TeamCode::Mil, TeamCode::Min, TeamCode::Nop, TeamCode::Nyk,
        TeamCode::Okc, TeamCode::Orl, TeamCode::Phi, TeamCode::Pho, TeamCode::Por,
        TeamCode::Sac, TeamCode::Sas, TeamCode::Tor, TeamCode::Uta, TeamCode::Was,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TeamCode::Bos => "BOS",
            TeamCode::Atl => "ATL",
            TeamCode::Brk => "BRK",
            TeamCode::Cho => "CHO",
            TeamCode::Chi => "CHI",
            TeamCode::Cle => "CLE",
            TeamCode::Dal => "DAL",
            TeamCode::Den => "DEN",
            TeamCode::Det => "DET",
            TeamCode::Gsw => "GSW",
            TeamCode::Hou => "HOU",
            TeamCode::Ind => "IND",
            TeamCode::Lac => "LAC",
            TeamCode::Lal => "LAL",
            TeamCode::Mem => "MEM",
            TeamCode::Mia => "MIA",
            TeamCode::Mil => "MIL",
            TeamCode::Min => "MIN",
            TeamCode::Nop => "NOP",
            TeamCode::Nyk => "NYK",
            TeamCode::Okc => "OKC",
            TeamCode::Orl => "ORL",
            TeamCode::Phi => "PHI",
            TeamCode::Pho => "PHO",
            TeamCode::Por => "POR",
            TeamCode::Sac => "SAC",
            TeamCode::Sas => "SAS",
            TeamCode::Tor => "TOR",
            TeamCode::Uta => "UTA",
            TeamCode::Was => "WAS",
        }
    }
}

impl fmt::Display for TeamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamCode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        TeamCode::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| ModelError::UnknownTeam(s.to_string()))
    }
}

impl From<TeamCode> for String {
    fn from(team: TeamCode) -> Self {
        team.as_str().to_string()
    }
}

impl TryFrom<String> for TeamCode {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Season identified by the calendar year it ends in (2021 = 2020-21).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Season(pub u16);

impl Default for Season {
    fn default() -> Self {
        Season(2021)
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_codes_unique() {
        let codes: HashSet<&str> = TeamCode::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(codes.len(), 30);
        assert_eq!(TeamCode::ALL[0], TeamCode::Bos);
        assert_eq!(TeamCode::ALL[29], TeamCode::Was);
    }

    #[test]
    fn test_parse_team_code() {
        assert_eq!("BOS".parse::<TeamCode>().unwrap(), TeamCode::Bos);
        assert_eq!("cho".parse::<TeamCode>().unwrap(), TeamCode::Cho);
        assert_eq!(" pho ".parse::<TeamCode>().unwrap(), TeamCode::Pho);
        assert_eq!(
            "CHA".parse::<TeamCode>(),
            Err(ModelError::UnknownTeam("CHA".into()))
        );
    }

    #[test]
    fn test_round_trip_every_code() {
        for team in TeamCode::ALL {
            assert_eq!(team.to_string().parse::<TeamCode>().unwrap(), team);
        }
    }

    #[test]
    fn test_serde_as_code() {
        let json = serde_json::to_string(&vec![TeamCode::Gsw, TeamCode::Lal]).unwrap();
        assert_eq!(json, r#"["GSW","LAL"]"#);
        let back: Vec<TeamCode> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![TeamCode::Gsw, TeamCode::Lal]);
        assert!(serde_json::from_str::<TeamCode>(r#""XXX""#).is_err());
    }

    #[test]
    fn test_season_display() {
        assert_eq!(Season::default().to_string(), "2021");
        assert_eq!(Season(1999).to_string(), "1999");
    }
}
