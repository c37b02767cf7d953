use crate::codec::tables::code_table;

code_table! {
    Tiredness, field = "tiredness", {
        Fresh => "F",
        Tired => "T",
        Exhausted => "E",
    }
}

code_table! {
    Ammunition, field = "ammunition", {
        Plentiful => "P",
        Scarce => "S",
        Exhausted => "E",
    }
}

code_table! {
    Cohesion, field = "cohesion", {
        GoodOrder => "GO",
        Disrupted => "D",
        Rooted => "R",
        Deleted => "X",
    }
}

code_table! {
    /// Charge progress of a unit. `None` means the unit is not charging.
    Charging, field = "charging", {
        None => "N",
        BeginCharge => "BC",
        CanCharge => "CC",
        Charging => "C",
    }
}

code_table! {
    /// Position of a unit inside a hex shared with another unit.
    Stacking, field = "stacking", {
        Bottom => "B",
        Top => "T",
    }
}

code_table! {
    UnitCategory, field = "category", {
        Troop => "T",
        Formation => "F",
        Character => "C",
    }
}
