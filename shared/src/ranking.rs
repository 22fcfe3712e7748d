use crate::models::{Leaderboard, Member, RankedMember};

pub const PODIUM_SIZE: usize = 3;

/// Orders members by points, highest first. Ties keep their store order.
pub fn rank_members(members: Vec<Member>) -> Leaderboard {
    let mut sorted = members;
    sorted.sort_by(|a, b| b.points.cmp(&a.points));

    let members: Vec<RankedMember> = sorted
        .into_iter()
        .enumerate()
        .map(|(idx, member)| RankedMember {
            rank: idx + 1,
            nickname: member.nickname,
            points: member.points,
        })
        .collect();

    let podium = match members.as_slice() {
        [first, second, third, ..] => Some([first.clone(), second.clone(), third.clone()]),
        _ => None,
    };

    Leaderboard { podium, members }
}
